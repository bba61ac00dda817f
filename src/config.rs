//! Store and coordinator settings, loaded from TOML
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the sled database.
    pub path: PathBuf,
    /// Delete the database when the store is dropped. `path` is ignored.
    pub temporary: bool,
    pub cache_capacity: Option<u64>,
    pub flush_every_ms: Option<u64>,
    /// How often a unit of work is replayed after a version conflict.
    pub max_conflict_retries: u32,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tender-ledger.db"),
            temporary: false,
            cache_capacity: None,
            flush_every_ms: Some(500),
            max_conflict_retries: 3,
            default_page_limit: 10,
            max_page_limit: 50,
        }
    }
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// In-memory style store that sled removes on drop.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(raw).context("failed to parse store config")?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.max_page_limit == 0 {
            anyhow::bail!("max_page_limit must be positive");
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            anyhow::bail!(
                "default_page_limit must be between 1 and max_page_limit ({})",
                self.max_page_limit
            );
        }
        Ok(())
    }

    pub(crate) fn sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .temporary(self.temporary)
            .flush_every_ms(self.flush_every_ms);
        // sled picks a fresh scratch location for temporary stores
        if !self.temporary {
            config = config.path(&self.path);
        }
        if let Some(capacity) = self.cache_capacity {
            config = config.cache_capacity(capacity);
        }
        config
    }
}
