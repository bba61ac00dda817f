//! Service layer API for tender and bid workflows
//!
//! Every mutation follows the same shape: shape checks, then one unit of work
//! that loads the entity, authorizes the caller, checks the status
//! transition, writes the current row and appends the next version.
mod bid;
mod tender;

pub use bid::BidService;
pub use tender::TenderService;

use crate::bid::Bid;
use crate::error::{Entity, Error, Result, ValidationError};
use crate::status;
use crate::store::{RecordView, Table, Tx};
use crate::tender::Tender;
use crate::types::TenderStatus;

pub(crate) fn load_tender<R: RecordView + ?Sized>(view: &R, tender_id: &str) -> Result<Tender> {
    view.read(Table::Tenders, tender_id.as_bytes())?
        .ok_or_else(|| Error::not_found(Entity::Tender, tender_id))
}

pub(crate) fn load_bid<R: RecordView + ?Sized>(view: &R, bid_id: &str) -> Result<Bid> {
    view.read(Table::Bids, bid_id.as_bytes())?
        .ok_or_else(|| Error::not_found(Entity::Bid, bid_id))
}

/// Write the current row of a new tender and its first version.
pub(crate) fn insert_tender(tx: &Tx<'_>, tender: &Tender) -> Result<()> {
    tx.write_new(Table::Tenders, tender.id.as_bytes(), tender)?;
    tx.start_history(&tender.snapshot()?)
}

/// Move `tender` to its next version and persist both rows.
pub(crate) fn commit_tender(tx: &Tx<'_>, tender: &mut Tender) -> Result<()> {
    let previous = tender.version;
    tender.version = previous + 1;
    tx.write(Table::Tenders, tender.id.as_bytes(), tender)?;
    tx.append_version(previous, &tender.snapshot()?)
}

pub(crate) fn insert_bid(tx: &Tx<'_>, bid: &Bid) -> Result<()> {
    tx.write_new(Table::Bids, bid.id.as_bytes(), bid)?;
    tx.start_history(&bid.snapshot()?)
}

pub(crate) fn commit_bid(tx: &Tx<'_>, bid: &mut Bid) -> Result<()> {
    let previous = bid.version;
    bid.version = previous + 1;
    tx.write(Table::Bids, bid.id.as_bytes(), bid)?;
    tx.append_version(previous, &bid.snapshot()?)
}

/// Close the tender a bid was just approved on, in the caller's unit.
pub(crate) fn close_tender(tx: &Tx<'_>, tender: &mut Tender) -> Result<()> {
    if tender.status == TenderStatus::Closed {
        return Err(Error::invalid("tender_id", ValidationError::TenderClosed));
    }
    status::tender_transition(tender.status, TenderStatus::Closed)?;
    tender.status = TenderStatus::Closed;
    commit_tender(tx, tender)
}

/// Content edits stop once a tender is closed.
pub(crate) fn ensure_tender_open(tender: &Tender) -> Result<()> {
    if tender.status.is_terminal() {
        return Err(Error::invalid(
            "status",
            ValidationError::TerminalState(tender.status.to_string()),
        ));
    }
    Ok(())
}

pub(crate) fn ensure_bid_open(bid: &Bid) -> Result<()> {
    if bid.status.is_terminal() {
        return Err(Error::invalid(
            "status",
            ValidationError::TerminalState(bid.status.to_string()),
        ));
    }
    Ok(())
}

/// Slice an already ordered listing.
pub(crate) fn paginate<T>(items: Vec<T>, (offset, limit): (usize, usize)) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}
