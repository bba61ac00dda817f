//! sled backed persistence for tenders, bids and the identity directory
//!
//! Each relation gets its own tree. Records are CBOR encoded with minicbor.
//! Every mutation runs through [`Store::atomically`], a multi-tree sled
//! transaction, so a unit of work either lands completely or not at all.
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{IVec, Transactional, Tree};
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tenders,
    TenderVersions,
    Bids,
    BidVersions,
    Feedbacks,
    Employees,
    Organizations,
    Responsible,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Tenders => "tenders",
            Table::TenderVersions => "tender_versions",
            Table::Bids => "bids",
            Table::BidVersions => "bid_versions",
            Table::Feedbacks => "bid_feedbacks",
            Table::Employees => "employees",
            Table::Organizations => "organizations",
            Table::Responsible => "organization_responsible",
        }
    }
}

/// Key of a child row: `parent_id / sequence`. Big endian so a prefix scan
/// walks children in order.
pub(crate) fn child_key(parent_id: &str, sequence: &[u8]) -> Vec<u8> {
    let mut key = child_prefix(parent_id);
    key.extend_from_slice(sequence);
    key
}

pub(crate) fn child_prefix(parent_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(parent_id.len() + 9);
    key.extend_from_slice(parent_id.as_bytes());
    key.push(b'/');
    key
}

/// Point reads shared by live trees and open transactions.
pub trait RecordView {
    fn fetch(&self, table: Table, key: &[u8]) -> Result<Option<IVec>>;

    fn read<T>(&self, table: Table, key: &[u8]) -> Result<Option<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.fetch(table, key)? {
            Some(raw) => Ok(Some(minicbor::decode(raw.as_ref())?)),
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    tenders: Tree,
    tender_versions: Tree,
    bids: Tree,
    bid_versions: Tree,
    feedbacks: Tree,
    employees: Tree,
    organizations: Tree,
    responsible: Tree,
    config: Config,
}

impl Store {
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let db = config.sled_config().open()?;
        Ok(Self::with_db(db, config.clone())?)
    }

    /// Wrap an already opened database, e.g. one living in a temp dir.
    pub fn with_db(db: sled::Db, config: Config) -> Result<Self> {
        Ok(Self {
            tenders: db.open_tree(Table::Tenders.name())?,
            tender_versions: db.open_tree(Table::TenderVersions.name())?,
            bids: db.open_tree(Table::Bids.name())?,
            bid_versions: db.open_tree(Table::BidVersions.name())?,
            feedbacks: db.open_tree(Table::Feedbacks.name())?,
            employees: db.open_tree(Table::Employees.name())?,
            organizations: db.open_tree(Table::Organizations.name())?,
            responsible: db.open_tree(Table::Responsible.name())?,
            db,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, table: Table) -> &Tree {
        match table {
            Table::Tenders => &self.tenders,
            Table::TenderVersions => &self.tender_versions,
            Table::Bids => &self.bids,
            Table::BidVersions => &self.bid_versions,
            Table::Feedbacks => &self.feedbacks,
            Table::Employees => &self.employees,
            Table::Organizations => &self.organizations,
            Table::Responsible => &self.responsible,
        }
    }

    /// Decode every record of `table`.
    pub(crate) fn all<T>(&self, table: Table) -> Result<Vec<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        self.tree(table)
            .iter()
            .values()
            .map(|raw| Ok(minicbor::decode(raw?.as_ref())?))
            .collect()
    }

    /// Decode the records whose key starts with `prefix`, in key order.
    pub(crate) fn scan<T>(&self, table: Table, prefix: &[u8]) -> Result<Vec<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        self.tree(table)
            .scan_prefix(prefix)
            .values()
            .map(|raw| Ok(minicbor::decode(raw?.as_ref())?))
            .collect()
    }

    /// Number of rows under `prefix`.
    pub fn count(&self, table: Table, prefix: &[u8]) -> usize {
        self.tree(table).scan_prefix(prefix).count()
    }

    /// Run `unit` inside one transaction spanning every tree.
    ///
    /// `unit` may be replayed: sled reruns it on internal conflicts, and a
    /// [`Error::Conflict`] it returns is retried up to
    /// `max_conflict_retries` times before reaching the caller.
    pub(crate) fn atomically<T, F>(&self, op: &'static str, unit: F) -> Result<T>
    where
        F: Fn(&Tx<'_>) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            let outcome: sled::transaction::TransactionResult<T, Error> = (
                &self.tenders,
                &self.tender_versions,
                &self.bids,
                &self.bid_versions,
                &self.feedbacks,
                &self.employees,
                &self.organizations,
                &self.responsible,
            )
                .transaction(
                    |(
                        tenders,
                        tender_versions,
                        bids,
                        bid_versions,
                        feedbacks,
                        employees,
                        organizations,
                        responsible,
                    )| {
                        let tx = Tx {
                            tenders,
                            tender_versions,
                            bids,
                            bid_versions,
                            feedbacks,
                            employees,
                            organizations,
                            responsible,
                        };
                        unit(&tx).map_err(ConflictableTransactionError::Abort)
                    },
                );

            match outcome {
                Ok(value) => return Ok(value),
                Err(TransactionError::Abort(Error::Conflict(reason)))
                    if attempt < self.config.max_conflict_retries =>
                {
                    attempt += 1;
                    warn!(op, attempt, %reason, "retrying unit of work after conflict");
                }
                Err(TransactionError::Abort(err)) => return Err(err),
                Err(TransactionError::Storage(err)) => return Err(err.into()),
            }
        }
    }
}

impl RecordView for Store {
    fn fetch(&self, table: Table, key: &[u8]) -> Result<Option<IVec>> {
        Ok(self.tree(table).get(key)?)
    }
}

/// Handle on the trees of an open transaction.
pub struct Tx<'a> {
    tenders: &'a TransactionalTree,
    tender_versions: &'a TransactionalTree,
    bids: &'a TransactionalTree,
    bid_versions: &'a TransactionalTree,
    feedbacks: &'a TransactionalTree,
    employees: &'a TransactionalTree,
    organizations: &'a TransactionalTree,
    responsible: &'a TransactionalTree,
}

impl Tx<'_> {
    fn tree(&self, table: Table) -> &TransactionalTree {
        match table {
            Table::Tenders => self.tenders,
            Table::TenderVersions => self.tender_versions,
            Table::Bids => self.bids,
            Table::BidVersions => self.bid_versions,
            Table::Feedbacks => self.feedbacks,
            Table::Employees => self.employees,
            Table::Organizations => self.organizations,
            Table::Responsible => self.responsible,
        }
    }

    pub(crate) fn write<T>(&self, table: Table, key: &[u8], value: &T) -> Result<()>
    where
        T: minicbor::Encode<()>,
    {
        self.tree(table).insert(key, minicbor::to_vec(value)?)?;
        Ok(())
    }

    /// Insert that refuses to overwrite: an occupied key is a [`Error::Conflict`].
    pub(crate) fn write_new<T>(&self, table: Table, key: &[u8], value: &T) -> Result<()>
    where
        T: minicbor::Encode<()>,
    {
        if self.tree(table).get(key)?.is_some() {
            return Err(Error::Conflict(format!(
                "{} already holds key {}",
                table.name(),
                String::from_utf8_lossy(key)
            )));
        }
        self.write(table, key, value)
    }

    /// Monotonic id, unique across the database.
    pub(crate) fn next_sequence(&self) -> Result<u64> {
        Ok(self.feedbacks.generate_id()?)
    }
}

impl RecordView for Tx<'_> {
    fn fetch(&self, table: Table, key: &[u8]) -> Result<Option<IVec>> {
        Ok(self.tree(table).get(key)?)
    }
}
