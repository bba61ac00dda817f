//! Identifier generation and content hashing

use bech32::Bech32m;
use uuid7::uuid7;

use crate::error::{Error, Result};

pub const TENDER_HRP: &str = "tender_";
pub const BID_HRP: &str = "bid_";
pub const REVIEW_HRP: &str = "review_";
pub const USER_HRP: &str = "user_";
pub const ORGANIZATION_HRP: &str = "org_";

// construct a unique, time ordered id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Same as [`new_uuid_to_bech32`] for the fixed prefixes used by records.
pub(crate) fn new_id(hrp: &str) -> Result<String> {
    new_uuid_to_bech32(hrp).map_err(|err| Error::Storage(format!("id generation failed: {err}")))
}

/// sha256 over the CBOR encoding of `value`.
pub fn content_digest<T: minicbor::Encode<()>>(value: &T) -> Result<String> {
    let cbor = minicbor::to_vec(value)?;
    Ok(sha256::digest(&cbor))
}
