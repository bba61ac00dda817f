//! Authorization predicates consulted before any write
use tracing::debug;

use crate::bid::Bid;
use crate::error::{Error, Result};
use crate::identity::IdentityResolver;
use crate::tender::Tender;
use crate::types::{OrganizationId, UserId};

/// Decides whether a username may act on a tender or bid.
///
/// An unknown username is `NotFound` from every predicate; only a resolved
/// identity gets a yes/no answer.
pub struct AuthorizationGate<'r, R: ?Sized> {
    identity: &'r R,
}

impl<'r, R: IdentityResolver + ?Sized> AuthorizationGate<'r, R> {
    pub fn new(identity: &'r R) -> Self {
        Self { identity }
    }

    pub fn is_author(&self, bid: &Bid, username: &str) -> Result<bool> {
        Ok(self.identity.resolve_user(username)? == bid.author_id)
    }

    pub fn is_responsible_for(&self, tender: &Tender, username: &str) -> Result<bool> {
        match self.identity.resolve_responsible_organization(username) {
            Ok(organization_id) => Ok(organization_id == tender.organization_id),
            Err(Error::NotAuthorized(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Author of the bid, or responsible for the tender it was placed on.
    pub fn can_view_bid(&self, bid: &Bid, tender: &Tender, username: &str) -> Result<bool> {
        debug_assert_eq!(bid.tender_id, tender.id);
        Ok(self.is_author(bid, username)? || self.is_responsible_for(tender, username)?)
    }

    pub fn require_author(&self, bid: &Bid, username: &str) -> Result<UserId> {
        let user_id = self.identity.resolve_user(username)?;
        if user_id != bid.author_id {
            debug!(bid_id = %bid.id, username, "rejected: not the bid author");
            return Err(Error::NotAuthor(username.to_string()));
        }
        Ok(user_id)
    }

    pub fn require_responsible(&self, tender: &Tender, username: &str) -> Result<OrganizationId> {
        let organization_id = self.identity.resolve_responsible_organization(username)?;
        if organization_id != tender.organization_id {
            debug!(tender_id = %tender.id, username, "rejected: not responsible for tender");
            return Err(Error::NotAuthorized(format!(
                "{username} is not responsible for tender {}",
                tender.id
            )));
        }
        Ok(organization_id)
    }
}
