//! Typed parameter records, one per operation. Parsing raw transport input
//! into these is the caller's job.
use crate::bid::BidPatch;
use crate::tender::TenderPatch;
use crate::types::{
    BidDecision, BidId, BidStatus, OrganizationId, Page, ServiceType, TenderId, TenderStatus,
    Username, Version,
};

#[derive(Debug, Clone)]
pub struct CreateTenderParams {
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
    pub organization_id: OrganizationId,
    pub creator_username: Username,
}

#[derive(Debug, Clone)]
pub struct EditTenderParams {
    pub tender_id: TenderId,
    pub username: Username,
    pub patch: TenderPatch,
}

#[derive(Debug, Clone)]
pub struct RollbackTenderParams {
    pub tender_id: TenderId,
    pub version: Version,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct GetTenderStatusParams {
    pub tender_id: TenderId,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct UpdateTenderStatusParams {
    pub tender_id: TenderId,
    pub status: TenderStatus,
    pub username: Username,
}

#[derive(Debug, Clone, Default)]
pub struct GetTendersParams {
    /// Empty means every service type.
    pub service_types: Vec<ServiceType>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct GetUserTendersParams {
    pub username: Username,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct CreateBidParams {
    pub name: String,
    pub description: String,
    pub status: BidStatus,
    pub tender_id: TenderId,
    /// Present when the bid is placed on behalf of an organization.
    pub organization_id: Option<OrganizationId>,
    pub creator_username: Username,
}

#[derive(Debug, Clone)]
pub struct EditBidParams {
    pub bid_id: BidId,
    pub username: Username,
    pub patch: BidPatch,
}

#[derive(Debug, Clone)]
pub struct RollbackBidParams {
    pub bid_id: BidId,
    pub version: Version,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct GetBidStatusParams {
    pub bid_id: BidId,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct UpdateBidStatusParams {
    pub bid_id: BidId,
    pub status: BidStatus,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct SubmitBidDecisionParams {
    pub bid_id: BidId,
    pub decision: BidDecision,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct SubmitBidFeedbackParams {
    pub bid_id: BidId,
    pub feedback: String,
    pub username: Username,
}

#[derive(Debug, Clone)]
pub struct GetBidsForTenderParams {
    pub tender_id: TenderId,
    pub username: Username,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct GetUserBidsParams {
    pub username: Username,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct GetBidReviewsParams {
    pub tender_id: TenderId,
    pub author_username: Username,
    pub requester_username: Username,
    pub page: Page,
}
