//! In-memory config storage
//!
//! Concurrent map of config values. Nothing survives the process.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::types::{Result, WardenError};

use super::{ConfigKey, ConfigStorage};

/// Config store with concurrent access
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Config values: key -> value
    values: DashMap<ConfigKey, String>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait::async_trait]
impl ConfigStorage for MemoryStorage {
    async fn save(&self, key: ConfigKey, value: &str) -> Result<()> {
        self.values.insert(key, value.to_string());
        debug!(key = %key, "Config value saved");
        Ok(())
    }

    async fn insert(&self, key: ConfigKey, value: &str) -> Result<()> {
        // The entry holds the shard lock, so check and insert are atomic.
        match self.values.entry(key) {
            Entry::Occupied(_) => Err(WardenError::Conflict(format!(
                "config key {key} already exists"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(value.to_string());
                debug!(key = %key, "Config value inserted");
                Ok(())
            }
        }
    }

    async fn get(&self, key: ConfigKey) -> Result<String> {
        self.values
            .get(&key)
            .map(|v| v.value().clone())
            .ok_or_else(|| WardenError::NotFound(format!("config key {key}")))
    }
}
