//! Versioned tenders and bids
//!
//! Tenders and the bids placed on them keep an append-only version log and
//! move through a small status lifecycle. Every mutation is checked against
//! organizational authority and lands as one atomic unit in a sled store.
//!
//! ```no_run
//! use tender_ledger::{Config, Store, TenderService};
//!
//! let store = Store::open(&Config::new("tenders.db"))?;
//! let tenders = TenderService::new(store.clone());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod authz;
pub mod bid;
pub mod config;
pub mod error;
pub mod identity;
pub mod params;
pub mod service;
pub mod status;
pub mod store;
pub mod tender;
pub mod types;
pub mod utils;
pub mod validation;
pub mod versions;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use service::{BidService, TenderService};
pub use store::Store;
