//! Shared value types: timestamps, ids and the enumerations carried by records
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, ValidationError};

pub type TenderId = String;
pub type BidId = String;
pub type UserId = String;
pub type OrganizationId = String;
pub type Username = String;
pub type Version = u32;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// RFC3339, the format the records are exposed with.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    #[n(0)]
    Construction,
    #[n(1)]
    Delivery,
    #[n(2)]
    Manufacture,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderStatus {
    #[n(0)]
    Created,
    #[n(1)]
    Published,
    #[n(2)]
    Closed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    #[n(0)]
    Created,
    #[n(1)]
    Published,
    #[n(2)]
    Canceled,
    #[n(3)]
    Approved,
    #[n(4)]
    Rejected,
}

/// The outcome an author records on their own bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidDecision {
    Approved,
    Rejected,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorType {
    #[n(0)]
    User,
    #[n(1)]
    Organization,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationType {
    #[n(0)]
    Ie,
    #[n(1)]
    Llc,
    #[n(2)]
    Jsc,
}

/// Pagination window for list operations. `None` fields fall back to the
/// configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

impl From<BidDecision> for BidStatus {
    fn from(value: BidDecision) -> Self {
        match value {
            BidDecision::Approved => BidStatus::Approved,
            BidDecision::Rejected => BidStatus::Rejected,
        }
    }
}

macro_rules! text_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(Error::invalid(
                        $field,
                        ValidationError::UnknownValue(other.to_string()),
                    )),
                }
            }
        }
    };
}

text_enum!(ServiceType, "service_type", {
    Construction => "Construction",
    Delivery => "Delivery",
    Manufacture => "Manufacture",
});

text_enum!(TenderStatus, "status", {
    Created => "Created",
    Published => "Published",
    Closed => "Closed",
});

text_enum!(BidStatus, "status", {
    Created => "Created",
    Published => "Published",
    Canceled => "Canceled",
    Approved => "Approved",
    Rejected => "Rejected",
});

text_enum!(BidDecision, "decision", {
    Approved => "Approved",
    Rejected => "Rejected",
});

text_enum!(AuthorType, "author_type", {
    User => "User",
    Organization => "Organization",
});

text_enum!(OrganizationType, "organization_type", {
    Ie => "IE",
    Llc => "LLC",
    Jsc => "JSC",
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn statuses_parse_from_their_wire_names() {
        assert_eq!("Published".parse::<TenderStatus>().unwrap(), TenderStatus::Published);
        assert_eq!("Canceled".parse::<BidStatus>().unwrap(), BidStatus::Canceled);
        assert_eq!("Delivery".parse::<ServiceType>().unwrap(), ServiceType::Delivery);
        assert_eq!("LLC".parse::<OrganizationType>().unwrap(), OrganizationType::Llc);
    }

    #[test]
    fn unknown_values_fail_validation() {
        let err = "Archived".parse::<TenderStatus>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        let err = "Cleaning".parse::<ServiceType>().unwrap_err();
        assert!(err.to_string().contains("service_type"));
    }

    #[test]
    fn decision_maps_onto_bid_status() {
        assert_eq!(BidStatus::from(BidDecision::Approved), BidStatus::Approved);
        assert_eq!(BidStatus::from(BidDecision::Rejected), BidStatus::Rejected);
    }
}
