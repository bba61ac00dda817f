//! Tender records and their version snapshots
use chrono::Utc;

use crate::error::Result;
use crate::types::{OrganizationId, ServiceType, TenderId, TenderStatus, TimeStamp, Version};
use crate::utils::content_digest;

/// Current state of a tender, keyed by id in the `tenders` tree.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Tender {
    #[n(0)]
    pub id: TenderId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub service_type: ServiceType,
    #[n(4)]
    pub status: TenderStatus,
    #[n(5)]
    pub organization_id: OrganizationId,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub version: Version,
}

/// The fields an edit may touch and a rollback restores.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct TenderContent {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub service_type: ServiceType,
}

/// Immutable snapshot appended to `tender_versions` on every accepted mutation.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct TenderVersion {
    #[n(0)]
    pub tender_id: TenderId,
    #[n(1)]
    pub version: Version,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub description: String,
    #[n(4)]
    pub service_type: ServiceType,
    #[n(5)]
    pub status: TenderStatus,
    #[n(6)]
    pub organization_id: OrganizationId,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub is_current: bool,
    #[n(9)]
    pub digest: String, // sha256 of the CBOR encoded TenderContent
}

/// Partial update; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenderPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<ServiceType>,
}

impl Tender {
    pub fn content(&self) -> TenderContent {
        TenderContent {
            name: self.name.clone(),
            description: self.description.clone(),
            service_type: self.service_type,
        }
    }

    pub(crate) fn restore(&mut self, content: TenderContent) {
        self.name = content.name;
        self.description = content.description;
        self.service_type = content.service_type;
    }

    pub(crate) fn apply(&mut self, patch: &TenderPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(service_type) = patch.service_type {
            self.service_type = service_type;
        }
    }

    /// Snapshot of the tender as it stands, flagged current.
    pub fn snapshot(&self) -> Result<TenderVersion> {
        Ok(TenderVersion {
            tender_id: self.id.clone(),
            version: self.version,
            name: self.name.clone(),
            description: self.description.clone(),
            service_type: self.service_type,
            status: self.status,
            organization_id: self.organization_id.clone(),
            created_at: TimeStamp::new(),
            is_current: true,
            digest: content_digest(&self.content())?,
        })
    }
}

impl TenderVersion {
    pub fn content(&self) -> TenderContent {
        TenderContent {
            name: self.name.clone(),
            description: self.description.clone(),
            service_type: self.service_type,
        }
    }
}

impl TenderPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.service_type.is_none()
    }
}
