use tracing::info;

use super::{
    close_tender, commit_bid, ensure_bid_open, insert_bid, load_bid, load_tender, paginate,
};
use crate::authz::AuthorizationGate;
use crate::bid::{Bid, BidReview, BidVersion};
use crate::error::{Entity, Error, Result, ValidationError};
use crate::identity::IdentityResolver;
use crate::params::{
    CreateBidParams, EditBidParams, GetBidReviewsParams, GetBidStatusParams,
    GetBidsForTenderParams, GetUserBidsParams, RollbackBidParams, SubmitBidDecisionParams,
    SubmitBidFeedbackParams, UpdateBidStatusParams,
};
use crate::status::{self, Effect};
use crate::store::{Store, Table, Tx, child_key, child_prefix};
use crate::tender::Tender;
use crate::types::{AuthorType, BidStatus, TenderStatus, TimeStamp};
use crate::utils::{BID_HRP, REVIEW_HRP, new_id};
use crate::validation;
use crate::versions::VersionStore;

pub struct BidService {
    store: Store,
}

impl BidService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Place a bid on an open tender. The bid always starts `Created`.
    pub fn create_bid(&self, params: CreateBidParams) -> Result<Bid> {
        validation::create_bid(&params)?;

        let bid = self.store.atomically("create_bid", |tx| {
            let tender = load_tender(tx, &params.tender_id)?;
            if let Some(organization_id) = &params.organization_id {
                if !tx.organization_exists(organization_id)? {
                    return Err(Error::not_found(
                        Entity::Organization,
                        organization_id.as_str(),
                    ));
                }
            }
            let author_id = tx.resolve_user(&params.creator_username)?;

            if tender.status == TenderStatus::Closed {
                return Err(Error::invalid("tender_id", ValidationError::TenderClosed));
            }

            let bid = Bid {
                id: new_id(BID_HRP)?,
                name: params.name.clone(),
                description: params.description.clone(),
                status: params.status,
                tender_id: tender.id,
                author_id,
                author_type: match params.organization_id {
                    Some(_) => AuthorType::Organization,
                    None => AuthorType::User,
                },
                created_at: TimeStamp::new(),
                version: 1,
            };
            insert_bid(tx, &bid)?;
            Ok(bid)
        })?;

        info!(bid_id = %bid.id, tender_id = %bid.tender_id, author_type = %bid.author_type, "created bid");
        Ok(bid)
    }

    pub fn edit_bid(&self, params: EditBidParams) -> Result<Bid> {
        validation::edit_bid(&params)?;

        let bid = self.store.atomically("edit_bid", |tx| {
            let mut bid = load_bid(tx, &params.bid_id)?;
            AuthorizationGate::new(tx).require_author(&bid, &params.username)?;
            ensure_bid_open(&bid)?;

            bid.apply(&params.patch);
            commit_bid(tx, &mut bid)?;
            Ok(bid)
        })?;

        info!(bid_id = %bid.id, version = bid.version, "edited bid");
        Ok(bid)
    }

    pub fn rollback_bid(&self, params: RollbackBidParams) -> Result<Bid> {
        validation::rollback_bid(&params)?;

        let bid = self.store.atomically("rollback_bid", |tx| {
            let mut bid = load_bid(tx, &params.bid_id)?;
            AuthorizationGate::new(tx).require_author(&bid, &params.username)?;
            ensure_bid_open(&bid)?;

            let target: BidVersion = tx.load_version(&bid.id, params.version)?;
            bid.restore(target.content());
            commit_bid(tx, &mut bid)?;
            Ok(bid)
        })?;

        info!(
            bid_id = %bid.id,
            restored = params.version,
            version = bid.version,
            "rolled back bid"
        );
        Ok(bid)
    }

    /// Status of a bid, for its author or the tender's owner.
    pub fn get_bid_status(&self, params: GetBidStatusParams) -> Result<BidStatus> {
        validation::required("bid_id", &params.bid_id)?;
        validation::required("username", &params.username)?;

        let bid = load_bid(&self.store, &params.bid_id)?;
        let tender = load_tender(&self.store, &bid.tender_id)?;
        if !AuthorizationGate::new(&self.store).can_view_bid(&bid, &tender, &params.username)? {
            return Err(Error::NotAuthorized(format!(
                "{} may not view bid {}",
                params.username, bid.id
            )));
        }
        Ok(bid.status)
    }

    /// Move a bid through its lifecycle. Judging (approve, reject) belongs
    /// to the tender's owner; publishing and canceling also to the author.
    /// Approval closes the tender in the same unit.
    pub fn update_bid_status(&self, params: UpdateBidStatusParams) -> Result<Bid> {
        validation::update_bid_status(&params)?;

        let (bid, tender) = self.store.atomically("update_bid_status", |tx| {
            let mut bid = load_bid(tx, &params.bid_id)?;
            let mut tender = load_tender(tx, &bid.tender_id)?;

            let gate = AuthorizationGate::new(tx);
            match params.status {
                BidStatus::Approved | BidStatus::Rejected => {
                    gate.require_responsible(&tender, &params.username)?;
                }
                _ => {
                    if !gate.can_view_bid(&bid, &tender, &params.username)? {
                        return Err(Error::NotAuthorized(format!(
                            "{} may not change bid {}",
                            params.username, bid.id
                        )));
                    }
                }
            }

            let effect = status::bid_transition(bid.status, params.status)?;
            settle(tx, &mut bid, &mut tender, params.status, effect)?;
            Ok((bid, tender))
        })?;

        info!(
            bid_id = %bid.id,
            status = %bid.status,
            version = bid.version,
            tender_status = %tender.status,
            "updated bid status"
        );
        Ok(bid)
    }

    /// The author's own verdict on their bid.
    pub fn submit_bid_decision(&self, params: SubmitBidDecisionParams) -> Result<Bid> {
        validation::submit_bid_decision(&params)?;

        let (bid, tender) = self.store.atomically("submit_bid_decision", |tx| {
            let mut bid = load_bid(tx, &params.bid_id)?;
            AuthorizationGate::new(tx).require_author(&bid, &params.username)?;
            let mut tender = load_tender(tx, &bid.tender_id)?;

            let effect = status::decision_transition(bid.status, params.decision)?;
            settle(tx, &mut bid, &mut tender, params.decision.into(), effect)?;
            Ok((bid, tender))
        })?;

        info!(
            bid_id = %bid.id,
            decision = %params.decision,
            version = bid.version,
            tender_status = %tender.status,
            "submitted bid decision"
        );
        Ok(bid)
    }

    /// Attach a review to a bid. Anyone known to the directory may review;
    /// the bid itself is not versioned by this.
    pub fn submit_bid_feedback(&self, params: SubmitBidFeedbackParams) -> Result<Bid> {
        validation::submit_bid_feedback(&params)?;

        let (bid, review_id) = self.store.atomically("submit_bid_feedback", |tx| {
            let bid = load_bid(tx, &params.bid_id)?;
            let author_id = tx.resolve_user(&params.username)?;

            let review = BidReview {
                id: new_id(REVIEW_HRP)?,
                bid_id: bid.id.clone(),
                author_id,
                description: params.feedback.clone(),
                created_at: TimeStamp::new(),
            };
            let key = child_key(&bid.id, &tx.next_sequence()?.to_be_bytes());
            tx.write_new(Table::Feedbacks, &key, &review)?;
            Ok((bid, review.id))
        })?;

        info!(bid_id = %bid.id, review_id = %review_id, "submitted bid feedback");
        Ok(bid)
    }

    /// Bids on a tender. Its owner sees all of them, anyone else only their own.
    pub fn get_bids_for_tender(&self, params: GetBidsForTenderParams) -> Result<Vec<Bid>> {
        validation::required("tender_id", &params.tender_id)?;
        validation::required("username", &params.username)?;
        let window = validation::page(&params.page, self.store.config())?;

        let tender = load_tender(&self.store, &params.tender_id)?;
        let user_id = self.store.resolve_user(&params.username)?;
        let owner = AuthorizationGate::new(&self.store).is_responsible_for(&tender, &params.username)?;

        let mut bids: Vec<Bid> = self.store.all(Table::Bids)?;
        bids.retain(|b| b.tender_id == tender.id && (owner || b.author_id == user_id));
        sort_bids(&mut bids);
        Ok(paginate(bids, window))
    }

    pub fn get_user_bids(&self, params: GetUserBidsParams) -> Result<Vec<Bid>> {
        validation::required("username", &params.username)?;
        let window = validation::page(&params.page, self.store.config())?;

        let user_id = self.store.resolve_user(&params.username)?;
        let mut bids: Vec<Bid> = self.store.all(Table::Bids)?;
        bids.retain(|b| b.author_id == user_id);
        sort_bids(&mut bids);
        Ok(paginate(bids, window))
    }

    /// Reviews left on one author's bids for a tender, oldest first. Only
    /// the tender's owner may read them.
    pub fn get_bid_reviews(&self, params: GetBidReviewsParams) -> Result<Vec<BidReview>> {
        validation::get_bid_reviews(&params)?;
        let window = validation::page(&params.page, self.store.config())?;

        let tender = load_tender(&self.store, &params.tender_id)?;
        let author_id = self.store.resolve_user(&params.author_username)?;
        let authored: Vec<Bid> = self
            .store
            .all::<Bid>(Table::Bids)?
            .into_iter()
            .filter(|b| b.tender_id == tender.id && b.author_id == author_id)
            .collect();
        if authored.is_empty() {
            return Err(Error::not_found(
                Entity::Bid,
                format!("{} on {}", params.author_username, tender.id),
            ));
        }
        AuthorizationGate::new(&self.store)
            .require_responsible(&tender, &params.requester_username)?;

        let mut reviews = Vec::new();
        for bid in &authored {
            reviews.extend(
                self.store
                    .scan::<BidReview>(Table::Feedbacks, &child_prefix(&bid.id))?,
            );
        }
        // stable, so same-instant reviews keep their per-bid sequence order
        reviews.sort_by_key(|r| r.created_at.to_datetime_utc());
        Ok(paginate(reviews, window))
    }

    pub fn get_bid_by_id(&self, bid_id: &str) -> Result<Bid> {
        validation::required("bid_id", bid_id)?;
        load_bid(&self.store, bid_id)
    }

    /// Full version log of a bid, for its author or the tender's owner.
    pub fn bid_history(&self, bid_id: &str, username: &str) -> Result<Vec<BidVersion>> {
        validation::required("bid_id", bid_id)?;
        validation::required("username", username)?;

        let bid = load_bid(&self.store, bid_id)?;
        let tender = load_tender(&self.store, &bid.tender_id)?;
        if !AuthorizationGate::new(&self.store).can_view_bid(&bid, &tender, username)? {
            return Err(Error::NotAuthorized(format!(
                "{username} may not view bid {}",
                bid.id
            )));
        }
        self.store.history(&bid.id)
    }
}

/// Record a bid's new status, closing its tender first when the change
/// calls for it.
fn settle(
    tx: &Tx<'_>,
    bid: &mut Bid,
    tender: &mut Tender,
    next: BidStatus,
    effect: Effect,
) -> Result<()> {
    if effect == Effect::CloseTender {
        close_tender(tx, tender)?;
        info!(tender_id = %tender.id, bid_id = %bid.id, "closing tender on bid approval");
    }
    bid.status = next;
    commit_bid(tx, bid)
}

fn sort_bids(bids: &mut [Bid]) {
    bids.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidPatch;
    use crate::config::Config;
    use crate::error::ErrorKind;
    use crate::params::{CreateTenderParams, GetTenderStatusParams};
    use crate::service::TenderService;
    use crate::tender::TenderVersion;
    use crate::types::{BidDecision, OrganizationType, Page, ServiceType};

    struct Fixture {
        store: Store,
        tenders: TenderService,
        bids: BidService,
        org_id: String,
        tender: Tender,
    }

    /// alice owns the tender, bob and carol bid on it.
    fn fixture() -> Fixture {
        let store = Store::open(&Config::temporary()).unwrap();
        let org = store
            .register_organization("Roads Ltd", OrganizationType::Llc)
            .unwrap();
        for name in ["alice", "bob", "carol"] {
            store.register_employee(name).unwrap();
        }
        store.assign_responsible("alice", &org.id).unwrap();

        let tenders = TenderService::new(store.clone());
        let tender = tenders
            .create_tender(CreateTenderParams {
                name: "Road repair".into(),
                description: "Resurface Main St".into(),
                service_type: ServiceType::Construction,
                status: TenderStatus::Published,
                organization_id: org.id.clone(),
                creator_username: "alice".into(),
            })
            .unwrap();

        Fixture {
            bids: BidService::new(store.clone()),
            tenders,
            store,
            org_id: org.id,
            tender,
        }
    }

    fn place(f: &Fixture, name: &str, author: &str) -> Bid {
        f.bids
            .create_bid(CreateBidParams {
                name: name.into(),
                description: "Two lanes".into(),
                status: BidStatus::Created,
                tender_id: f.tender.id.clone(),
                organization_id: None,
                creator_username: author.into(),
            })
            .unwrap()
    }

    fn set_status(f: &Fixture, bid: &Bid, status: BidStatus, username: &str) -> Result<Bid> {
        f.bids.update_bid_status(UpdateBidStatusParams {
            bid_id: bid.id.clone(),
            status,
            username: username.into(),
        })
    }

    #[test]
    fn author_type_follows_the_organization() {
        let f = fixture();
        assert_eq!(place(&f, "solo", "bob").author_type, AuthorType::User);

        let bid = f
            .bids
            .create_bid(CreateBidParams {
                name: "firm".into(),
                description: "d".into(),
                status: BidStatus::Created,
                tender_id: f.tender.id.clone(),
                organization_id: Some(f.org_id.clone()),
                creator_username: "bob".into(),
            })
            .unwrap();
        assert_eq!(bid.author_type, AuthorType::Organization);
        assert_eq!(bid.author_id, f.store.employee("bob").unwrap().id);
    }

    #[test]
    fn create_checks_referenced_records() {
        let f = fixture();
        let params = CreateBidParams {
            name: "x".into(),
            description: "d".into(),
            status: BidStatus::Created,
            tender_id: "tender_missing".into(),
            organization_id: None,
            creator_username: "bob".into(),
        };
        let err = f.bids.create_bid(params.clone()).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: Entity::Tender,
                ..
            }
        ));

        let err = f
            .bids
            .create_bid(CreateBidParams {
                tender_id: f.tender.id.clone(),
                organization_id: Some("org_missing".into()),
                ..params.clone()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: Entity::Organization,
                ..
            }
        ));

        let err = f
            .bids
            .create_bid(CreateBidParams {
                tender_id: f.tender.id.clone(),
                creator_username: "mallory".into(),
                ..params
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: Entity::User,
                ..
            }
        ));
        assert!(f.store.all::<Bid>(Table::Bids).unwrap().is_empty());
    }

    #[test]
    fn only_the_author_edits() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        let params = EditBidParams {
            bid_id: bid.id.clone(),
            username: "carol".into(),
            patch: BidPatch {
                name: Some("Concrete".into()),
                ..Default::default()
            },
        };

        let err = f.bids.edit_bid(params.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthor);
        assert_eq!(f.bids.get_bid_by_id(&bid.id).unwrap().version, 1);

        let edited = f
            .bids
            .edit_bid(EditBidParams {
                username: "bob".into(),
                ..params
            })
            .unwrap();
        assert_eq!(edited.version, 2);
        assert_eq!(edited.name, "Concrete");
        assert_eq!(edited.description, "Two lanes");
    }

    #[test]
    fn approval_closes_the_tender_in_the_same_unit() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        set_status(&f, &bid, BidStatus::Published, "bob").unwrap();

        let err = set_status(&f, &bid, BidStatus::Approved, "bob").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        assert_eq!(f.store.history::<BidVersion>(&bid.id).unwrap().len(), 2);
        assert_eq!(f.store.history::<TenderVersion>(&f.tender.id).unwrap().len(), 1);

        let approved = set_status(&f, &bid, BidStatus::Approved, "alice").unwrap();
        assert_eq!(approved.status, BidStatus::Approved);
        assert_eq!(approved.version, 3);

        let status = f
            .tenders
            .get_tender_status(GetTenderStatusParams {
                tender_id: f.tender.id.clone(),
                username: "alice".into(),
            })
            .unwrap();
        assert_eq!(status, TenderStatus::Closed);

        let history: Vec<TenderVersion> = f.store.history(&f.tender.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, TenderStatus::Closed);
        assert!(history[1].is_current);
    }

    #[test]
    fn second_approval_fails_on_closed_tender() {
        let f = fixture();
        let first = place(&f, "a", "bob");
        let second = place(&f, "b", "carol");
        for bid in [&first, &second] {
            set_status(&f, bid, BidStatus::Published, "alice").unwrap();
        }
        set_status(&f, &first, BidStatus::Approved, "alice").unwrap();

        let err = set_status(&f, &second, BidStatus::Approved, "alice").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                reason: ValidationError::TenderClosed,
                ..
            }
        ));
        let untouched = f.bids.get_bid_by_id(&second.id).unwrap();
        assert_eq!(untouched.status, BidStatus::Published);
        assert_eq!(untouched.version, 2);
    }

    #[test]
    fn outsiders_cannot_move_a_bid() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");

        for status in [
            BidStatus::Published,
            BidStatus::Canceled,
            BidStatus::Approved,
            BidStatus::Rejected,
        ] {
            let err = set_status(&f, &bid, status, "carol").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        }

        assert_eq!(f.store.history::<BidVersion>(&bid.id).unwrap().len(), 1);
        assert_eq!(f.store.history::<TenderVersion>(&f.tender.id).unwrap().len(), 1);
        assert_eq!(f.bids.get_bid_by_id(&bid.id).unwrap().status, BidStatus::Created);
    }

    #[test]
    fn decisions_belong_to_the_author() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        set_status(&f, &bid, BidStatus::Published, "bob").unwrap();

        let decide = |username: &str| {
            f.bids.submit_bid_decision(SubmitBidDecisionParams {
                bid_id: bid.id.clone(),
                decision: BidDecision::Rejected,
                username: username.into(),
            })
        };
        assert_eq!(decide("alice").unwrap_err().kind(), ErrorKind::NotAuthor);

        let rejected = decide("bob").unwrap();
        assert_eq!(rejected.status, BidStatus::Rejected);
        assert_eq!(
            f.tenders.get_tender_by_id(&f.tender.id).unwrap().status,
            TenderStatus::Published
        );
    }

    #[test]
    fn terminal_bids_reject_edits_and_rollbacks() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        set_status(&f, &bid, BidStatus::Canceled, "bob").unwrap();

        let err = f
            .bids
            .rollback_bid(RollbackBidParams {
                bid_id: bid.id.clone(),
                version: 1,
                username: "bob".into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                reason: ValidationError::TerminalState(_),
                ..
            }
        ));
    }

    #[test]
    fn rollback_restores_content_but_not_status() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        f.bids
            .edit_bid(EditBidParams {
                bid_id: bid.id.clone(),
                username: "bob".into(),
                patch: BidPatch {
                    description: Some("Four lanes".into()),
                    ..Default::default()
                },
            })
            .unwrap();
        set_status(&f, &bid, BidStatus::Published, "bob").unwrap();

        let rolled = f
            .bids
            .rollback_bid(RollbackBidParams {
                bid_id: bid.id.clone(),
                version: 1,
                username: "bob".into(),
            })
            .unwrap();
        assert_eq!(rolled.version, 4);
        assert_eq!(rolled.description, "Two lanes");
        assert_eq!(rolled.status, BidStatus::Published);

        let history = f.bids.bid_history(&bid.id, "alice").unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
    }

    #[test]
    fn feedback_does_not_version_the_bid() {
        let f = fixture();
        let bid = place(&f, "Asphalt", "bob");
        for text in ["first", "second"] {
            let returned = f
                .bids
                .submit_bid_feedback(SubmitBidFeedbackParams {
                    bid_id: bid.id.clone(),
                    feedback: text.into(),
                    username: "carol".into(),
                })
                .unwrap();
            assert_eq!(returned.version, 1);
        }

        let reviews = f
            .bids
            .get_bid_reviews(GetBidReviewsParams {
                tender_id: f.tender.id.clone(),
                author_username: "bob".into(),
                requester_username: "alice".into(),
                page: Page::default(),
            })
            .unwrap();
        let texts: Vec<_> = reviews.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(f.store.count(Table::Feedbacks, &child_prefix(&bid.id)), 2);
    }

    #[test]
    fn reviews_require_a_bid_and_ownership() {
        let f = fixture();
        place(&f, "Asphalt", "bob");

        let params = GetBidReviewsParams {
            tender_id: f.tender.id.clone(),
            author_username: "carol".into(),
            requester_username: "alice".into(),
            page: Page::default(),
        };
        let err = f.bids.get_bid_reviews(params.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f
            .bids
            .get_bid_reviews(GetBidReviewsParams {
                author_username: "bob".into(),
                requester_username: "carol".into(),
                ..params
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn bid_listings_respect_visibility() {
        let f = fixture();
        place(&f, "b", "bob");
        place(&f, "a", "carol");
        place(&f, "c", "bob");

        let list = |username: &str| {
            f.bids
                .get_bids_for_tender(GetBidsForTenderParams {
                    tender_id: f.tender.id.clone(),
                    username: username.into(),
                    page: Page::default(),
                })
                .unwrap()
                .into_iter()
                .map(|b| b.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(list("alice"), vec!["a", "b", "c"]);
        assert_eq!(list("bob"), vec!["b", "c"]);

        let mine = f
            .bids
            .get_user_bids(GetUserBidsParams {
                username: "carol".into(),
                page: Page::default(),
            })
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
