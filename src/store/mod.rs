//! Config storage
//!
//! A small key/value store used to persist the sealed master key. Two
//! backends are provided:
//!
//! - [`MemoryStorage`]: DashMap-backed, for tests and ephemeral dev runs
//! - [`SqliteStorage`]: a single `config` table in SQLite
//!
//! [`ConfigService`] is the typed view the master key manager talks to.

pub mod memory;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::secret::SealedKey;
use crate::types::{Result, WardenError};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// A reserved configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigKey(&'static str);

impl ConfigKey {
    /// Holds the base64 `SealedKey` of the master key.
    pub const MASTER_KEY: ConfigKey = ConfigKey("masterkey");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Backend for configuration values.
///
/// Implementations must make `insert` atomic: of two concurrent inserts under
/// the same key exactly one succeeds.
#[async_trait::async_trait]
pub trait ConfigStorage: Send + Sync {
    /// Insert or overwrite a value.
    async fn save(&self, key: ConfigKey, value: &str) -> Result<()>;

    /// Insert a value, failing with [`WardenError::Conflict`] if the key is
    /// already present.
    async fn insert(&self, key: ConfigKey, value: &str) -> Result<()>;

    /// Read a value, failing with [`WardenError::NotFound`] if absent.
    async fn get(&self, key: ConfigKey) -> Result<String>;
}

/// Typed access to the configuration values used by Keywarden.
#[derive(Clone)]
pub struct ConfigService {
    storage: Arc<dyn ConfigStorage>,
}

impl ConfigService {
    pub fn new(storage: Arc<dyn ConfigStorage>) -> Self {
        Self { storage }
    }

    /// Fetch the stored master key record.
    ///
    /// Returns [`WardenError::NotFound`] when no master key was ever registered.
    pub async fn get_master_key(&self) -> Result<SealedKey> {
        let encoded = self.storage.get(ConfigKey::MASTER_KEY).await?;

        SealedKey::from_base64(&encoded).map_err(|e| {
            WardenError::Internal(format!("stored master key is corrupted: {e}"))
        })
    }

    /// Persist the master key record. Never overwrites an existing record:
    /// a second registration fails with [`WardenError::AlreadyExists`].
    pub async fn register_master_key(&self, sealed: &SealedKey) -> Result<()> {
        match self
            .storage
            .insert(ConfigKey::MASTER_KEY, &sealed.to_base64())
            .await
        {
            Ok(()) => {
                debug!(key = %ConfigKey::MASTER_KEY, "Master key record stored");
                Ok(())
            }
            Err(WardenError::Conflict(_)) => Err(WardenError::AlreadyExists),
            Err(e) => Err(e),
        }
    }
}
