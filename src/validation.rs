//! Shape checks that run before any storage access
use crate::config::Config;
use crate::error::{Error, Result, ValidationError};
use crate::params::*;
use crate::status;
use crate::types::{BidStatus, Page, TenderStatus};

pub const MAX_TENDER_NAME: usize = 100;
pub const MAX_TENDER_DESCRIPTION: usize = 1000;
pub const MAX_BID_NAME: usize = 100;
pub const MAX_BID_DESCRIPTION: usize = 500;
pub const MAX_FEEDBACK: usize = 1000;

pub fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(field, ValidationError::Empty));
    }
    Ok(())
}

/// Non-empty and at most `max` characters.
pub fn bounded(field: &'static str, value: &str, max: usize) -> Result<()> {
    required(field, value)?;
    let actual = value.chars().count();
    if actual > max {
        return Err(Error::invalid(
            field,
            ValidationError::ExceededLength { max, actual },
        ));
    }
    Ok(())
}

fn version(value: u32) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid("version", ValidationError::InvalidVersion));
    }
    Ok(())
}

/// Resolve a page against the configured limits into `(offset, limit)`.
pub fn page(page: &Page, config: &Config) -> Result<(usize, usize)> {
    let limit = page.limit.unwrap_or(config.default_page_limit);
    if limit == 0 || limit > config.max_page_limit {
        return Err(Error::invalid(
            "limit",
            ValidationError::InvalidPage {
                max: config.max_page_limit,
            },
        ));
    }
    Ok((page.offset.unwrap_or(0) as usize, limit as usize))
}

pub fn create_tender(params: &CreateTenderParams) -> Result<()> {
    bounded("name", &params.name, MAX_TENDER_NAME)?;
    bounded("description", &params.description, MAX_TENDER_DESCRIPTION)?;
    required("organization_id", &params.organization_id)?;
    required("creator_username", &params.creator_username)?;
    if params.status == TenderStatus::Closed {
        return Err(Error::invalid(
            "status",
            ValidationError::InvalidInitialStatus,
        ));
    }
    Ok(())
}

pub fn edit_tender(params: &EditTenderParams) -> Result<()> {
    required("tender_id", &params.tender_id)?;
    required("username", &params.username)?;
    if params.patch.is_empty() {
        return Err(Error::invalid("patch", ValidationError::NothingToUpdate));
    }
    if let Some(name) = &params.patch.name {
        bounded("name", name, MAX_TENDER_NAME)?;
    }
    if let Some(description) = &params.patch.description {
        bounded("description", description, MAX_TENDER_DESCRIPTION)?;
    }
    Ok(())
}

pub fn rollback_tender(params: &RollbackTenderParams) -> Result<()> {
    required("tender_id", &params.tender_id)?;
    required("username", &params.username)?;
    version(params.version)
}

pub fn update_tender_status(params: &UpdateTenderStatusParams) -> Result<()> {
    required("tender_id", &params.tender_id)?;
    required("username", &params.username)?;
    if params.status == TenderStatus::Created {
        return Err(Error::invalid(
            "status",
            ValidationError::InvalidTransition {
                from: "any".into(),
                to: TenderStatus::Created.to_string(),
            },
        ));
    }
    Ok(())
}

pub fn create_bid(params: &CreateBidParams) -> Result<()> {
    bounded("name", &params.name, MAX_BID_NAME)?;
    bounded("description", &params.description, MAX_BID_DESCRIPTION)?;
    status::initial_bid_status(params.status)?;
    required("tender_id", &params.tender_id)?;
    if let Some(organization_id) = &params.organization_id {
        required("organization_id", organization_id)?;
    }
    required("creator_username", &params.creator_username)
}

pub fn edit_bid(params: &EditBidParams) -> Result<()> {
    required("bid_id", &params.bid_id)?;
    required("username", &params.username)?;
    if params.patch.is_empty() {
        return Err(Error::invalid("patch", ValidationError::NothingToUpdate));
    }
    if let Some(name) = &params.patch.name {
        bounded("name", name, MAX_BID_NAME)?;
    }
    if let Some(description) = &params.patch.description {
        bounded("description", description, MAX_BID_DESCRIPTION)?;
    }
    Ok(())
}

pub fn rollback_bid(params: &RollbackBidParams) -> Result<()> {
    required("bid_id", &params.bid_id)?;
    required("username", &params.username)?;
    version(params.version)
}

pub fn update_bid_status(params: &UpdateBidStatusParams) -> Result<()> {
    required("bid_id", &params.bid_id)?;
    required("username", &params.username)?;
    if params.status == BidStatus::Created {
        return Err(Error::invalid(
            "status",
            ValidationError::InvalidTransition {
                from: "any".into(),
                to: BidStatus::Created.to_string(),
            },
        ));
    }
    Ok(())
}

pub fn submit_bid_decision(params: &SubmitBidDecisionParams) -> Result<()> {
    required("bid_id", &params.bid_id)?;
    required("username", &params.username)
}

pub fn submit_bid_feedback(params: &SubmitBidFeedbackParams) -> Result<()> {
    required("bid_id", &params.bid_id)?;
    required("username", &params.username)?;
    bounded("feedback", &params.feedback, MAX_FEEDBACK)
}

pub fn get_bid_reviews(params: &GetBidReviewsParams) -> Result<()> {
    required("tender_id", &params.tender_id)?;
    required("author_username", &params.author_username)?;
    required("requester_username", &params.requester_username)
}
