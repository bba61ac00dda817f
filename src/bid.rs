//! Bid records, their version snapshots and the reviews left on them
use chrono::Utc;

use crate::error::Result;
use crate::types::{AuthorType, BidId, BidStatus, TenderId, TimeStamp, UserId, Version};
use crate::utils::content_digest;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    #[n(0)]
    pub id: BidId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub status: BidStatus,
    #[n(4)]
    pub tender_id: TenderId,
    #[n(5)]
    pub author_id: UserId,
    #[n(6)]
    pub author_type: AuthorType,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub version: Version,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct BidContent {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub description: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct BidVersion {
    #[n(0)]
    pub bid_id: BidId,
    #[n(1)]
    pub version: Version,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub description: String,
    #[n(4)]
    pub author_id: UserId,
    #[n(5)]
    pub status: BidStatus,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub is_current: bool,
    #[n(8)]
    pub digest: String,
}

/// Feedback left on a bid. Never versioned, never edited.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct BidReview {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub bid_id: BidId,
    #[n(2)]
    pub author_id: UserId,
    #[n(3)]
    pub description: String,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Bid {
    pub fn content(&self) -> BidContent {
        BidContent {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub(crate) fn restore(&mut self, content: BidContent) {
        self.name = content.name;
        self.description = content.description;
    }

    pub(crate) fn apply(&mut self, patch: &BidPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
    }

    pub fn snapshot(&self) -> Result<BidVersion> {
        Ok(BidVersion {
            bid_id: self.id.clone(),
            version: self.version,
            name: self.name.clone(),
            description: self.description.clone(),
            author_id: self.author_id.clone(),
            status: self.status,
            created_at: TimeStamp::new(),
            is_current: true,
            digest: content_digest(&self.content())?,
        })
    }
}

impl BidVersion {
    pub fn content(&self) -> BidContent {
        BidContent {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

impl BidPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}
