//! Append-only version logs
//!
//! Rows live under `entity_id / version` in their entity's version tree.
//! Exactly one row per entity carries `is_current`. Appending flips the
//! previous current row and inserts the next number; the insert refuses to
//! overwrite, which is what turns two racing writers into a conflict.
use crate::bid::BidVersion;
use crate::error::{Entity, Error, Result};
use crate::store::{RecordView, Store, Table, Tx, child_key, child_prefix};
use crate::tender::TenderVersion;
use crate::types::Version;

pub trait VersionRecord: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    const TABLE: Table;

    fn entity_id(&self) -> &str;
    fn number(&self) -> Version;
    fn is_current(&self) -> bool;
    fn set_current(&mut self, current: bool);
}

impl VersionRecord for TenderVersion {
    const TABLE: Table = Table::TenderVersions;

    fn entity_id(&self) -> &str {
        &self.tender_id
    }
    fn number(&self) -> Version {
        self.version
    }
    fn is_current(&self) -> bool {
        self.is_current
    }
    fn set_current(&mut self, current: bool) {
        self.is_current = current;
    }
}

impl VersionRecord for BidVersion {
    const TABLE: Table = Table::BidVersions;

    fn entity_id(&self) -> &str {
        &self.bid_id
    }
    fn number(&self) -> Version {
        self.version
    }
    fn is_current(&self) -> bool {
        self.is_current
    }
    fn set_current(&mut self, current: bool) {
        self.is_current = current;
    }
}

pub(crate) fn version_key(entity_id: &str, number: Version) -> Vec<u8> {
    child_key(entity_id, &number.to_be_bytes())
}

pub trait VersionStore {
    /// A historical row, or `NotFound` naming the missing version.
    fn load_version<V: VersionRecord>(&self, entity_id: &str, number: Version) -> Result<V>;
}

impl<R: RecordView + ?Sized> VersionStore for R {
    fn load_version<V: VersionRecord>(&self, entity_id: &str, number: Version) -> Result<V> {
        self.read::<V>(V::TABLE, &version_key(entity_id, number))?
            .ok_or_else(|| Error::not_found(Entity::Version, format!("{entity_id}@{number}")))
    }
}

impl Tx<'_> {
    /// Write version 1 of a fresh entity.
    pub(crate) fn start_history<V: VersionRecord>(&self, row: &V) -> Result<()> {
        debug_assert_eq!(row.number(), 1);
        self.write_new(V::TABLE, &version_key(row.entity_id(), row.number()), row)
    }

    /// Retire `previous` and append `row`, which must be numbered `previous + 1`.
    pub(crate) fn append_version<V: VersionRecord>(&self, previous: Version, row: &V) -> Result<()> {
        let entity_id = row.entity_id();
        if row.number() != previous + 1 {
            return Err(Error::Conflict(format!(
                "{entity_id} expected version {} but got {}",
                previous + 1,
                row.number()
            )));
        }

        let mut retired: V = self.load_version(entity_id, previous)?;
        if !retired.is_current() {
            return Err(Error::Conflict(format!(
                "{entity_id} version {previous} is no longer current"
            )));
        }
        retired.set_current(false);
        self.write(V::TABLE, &version_key(entity_id, previous), &retired)?;

        self.write_new(V::TABLE, &version_key(entity_id, row.number()), row)
    }
}

impl Store {
    /// Every version row of an entity, oldest first.
    pub fn history<V: VersionRecord>(&self, entity_id: &str) -> Result<Vec<V>> {
        self.scan(V::TABLE, &child_prefix(entity_id))
    }
}
