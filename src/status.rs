//! Status lifecycles for tenders and bids
//!
//! Tenders move `Created -> Published -> Closed`, and may jump straight to
//! `Closed`. Bids move `Created -> Published -> {Approved, Rejected, Canceled}`,
//! and a bid that was never published may still be canceled. Terminal states
//! have no outgoing edges.
use crate::error::{Error, Result, ValidationError};
use crate::types::{BidDecision, BidStatus, TenderStatus};

/// Work a bid transition drags along with it inside the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    CloseTender,
}

impl TenderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TenderStatus::Closed)
    }

    pub fn can_transition_to(self, next: TenderStatus) -> bool {
        use TenderStatus::*;
        matches!(
            (self, next),
            (Created, Published) | (Created, Closed) | (Published, Closed)
        )
    }
}

impl BidStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BidStatus::Approved | BidStatus::Rejected | BidStatus::Canceled
        )
    }

    pub fn can_transition_to(self, next: BidStatus) -> bool {
        use BidStatus::*;
        matches!(
            (self, next),
            (Created, Published)
                | (Created, Canceled)
                | (Published, Approved)
                | (Published, Rejected)
                | (Published, Canceled)
        )
    }
}

pub fn tender_transition(from: TenderStatus, to: TenderStatus) -> Result<()> {
    if from.is_terminal() {
        return Err(Error::invalid(
            "status",
            ValidationError::TerminalState(from.to_string()),
        ));
    }
    if !from.can_transition_to(to) {
        return Err(invalid_transition(from, to));
    }
    Ok(())
}

/// Checks a tender-owner driven bid status change.
pub fn bid_transition(from: BidStatus, to: BidStatus) -> Result<Effect> {
    if to == BidStatus::Created {
        return Err(invalid_transition(from, to));
    }
    if from.is_terminal() {
        return Err(Error::invalid(
            "status",
            ValidationError::TerminalState(from.to_string()),
        ));
    }
    if !from.can_transition_to(to) {
        return Err(invalid_transition(from, to));
    }

    Ok(match to {
        BidStatus::Approved => Effect::CloseTender,
        _ => Effect::None,
    })
}

/// Checks an author's decision on their own bid.
pub fn decision_transition(from: BidStatus, decision: BidDecision) -> Result<Effect> {
    bid_transition(from, decision.into())
}

/// Bids only ever come into existence as `Created`.
pub fn initial_bid_status(status: BidStatus) -> Result<()> {
    match status {
        BidStatus::Created => Ok(()),
        _ => Err(Error::invalid(
            "status",
            ValidationError::InvalidInitialStatus,
        )),
    }
}

fn invalid_transition(from: impl ToString, to: impl ToString) -> Error {
    Error::invalid(
        "status",
        ValidationError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn tender_moves_forward_only() {
        assert!(tender_transition(TenderStatus::Created, TenderStatus::Published).is_ok());
        assert!(tender_transition(TenderStatus::Published, TenderStatus::Closed).is_ok());
        assert!(tender_transition(TenderStatus::Created, TenderStatus::Closed).is_ok());
        assert!(tender_transition(TenderStatus::Published, TenderStatus::Created).is_err());
        assert!(tender_transition(TenderStatus::Published, TenderStatus::Published).is_err());
    }

    #[test]
    fn nothing_leaves_closed() {
        for to in [
            TenderStatus::Created,
            TenderStatus::Published,
            TenderStatus::Closed,
        ] {
            let err = tender_transition(TenderStatus::Closed, to).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        }
    }

    #[test]
    fn approving_closes_the_tender() {
        assert_eq!(
            bid_transition(BidStatus::Published, BidStatus::Approved).unwrap(),
            Effect::CloseTender
        );
        assert_eq!(
            bid_transition(BidStatus::Published, BidStatus::Rejected).unwrap(),
            Effect::None
        );
        assert_eq!(
            decision_transition(BidStatus::Published, BidDecision::Approved).unwrap(),
            Effect::CloseTender
        );
    }

    #[test]
    fn created_is_never_a_target() {
        for from in [BidStatus::Created, BidStatus::Published] {
            assert!(bid_transition(from, BidStatus::Created).is_err());
        }
    }

    #[test]
    fn unpublished_bids_cannot_be_judged() {
        assert!(bid_transition(BidStatus::Created, BidStatus::Approved).is_err());
        assert!(decision_transition(BidStatus::Created, BidDecision::Rejected).is_err());
        assert!(bid_transition(BidStatus::Created, BidStatus::Canceled).is_ok());
    }

    #[test]
    fn terminal_bids_stay_put() {
        for from in [BidStatus::Approved, BidStatus::Rejected, BidStatus::Canceled] {
            let err = bid_transition(from, BidStatus::Published).unwrap_err();
            assert!(matches!(
                err,
                Error::Validation {
                    reason: ValidationError::TerminalState(_),
                    ..
                }
            ));
        }
    }

    #[test]
    fn only_created_is_a_valid_start() {
        assert!(initial_bid_status(BidStatus::Created).is_ok());
        assert!(initial_bid_status(BidStatus::Published).is_err());
    }
}
