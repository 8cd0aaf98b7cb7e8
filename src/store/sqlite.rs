//! SQLite-backed config storage.
//!
//! Values live in a single `config` table keyed by the config key. Blocking
//! SQLite calls run on the tokio blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::types::{Result, WardenError};

use super::{ConfigKey, ConfigStorage};

/// File name of the config database inside the data directory.
pub const CONFIG_DB_FILE: &str = "config.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);";

/// Config storage backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open or create `config.db` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            WardenError::Storage(format!(
                "creating data directory {}: {e}",
                data_dir.display()
            ))
        })?;
        let db_path = data_dir.join(CONFIG_DB_FILE);
        let conn = Connection::open(&db_path).map_err(|e| {
            WardenError::Storage(format!("opening database at {}: {e}", db_path.display()))
        })?;

        // WAL mode lets readers proceed while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let storage = Self::from_connection(conn)?;
        info!(path = %db_path.display(), "Config storage initialized");
        Ok(storage)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| WardenError::Storage("config connection poisoned".into()))?;
            f(&conn)
        })
        .await?
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait::async_trait]
impl ConfigStorage for SqliteStorage {
    async fn save(&self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                rusqlite::params![key.as_str(), value],
            )?;
            debug!(key = %key, "Config value saved");
            Ok(())
        })
        .await
    }

    async fn insert(&self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.to_string();
        self.with_conn(move |conn| {
            match conn.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)",
                rusqlite::params![key.as_str(), value],
            ) {
                Ok(_) => {
                    debug!(key = %key, "Config value inserted");
                    Ok(())
                }
                Err(e) if is_unique_violation(&e) => Err(WardenError::Conflict(format!(
                    "config key {key} already exists"
                ))),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn get(&self, key: ConfigKey) -> Result<String> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached("SELECT value FROM config WHERE key = ?1")?;
            stmt.query_row([key.as_str()], |row| row.get::<_, String>(0))
                .optional()?
                .ok_or_else(|| WardenError::NotFound(format!("config key {key}")))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let store = SqliteStorage::open_in_memory().unwrap();

        store.insert(ConfigKey::MASTER_KEY, "sealed").await.unwrap();

        assert_eq!(store.get(ConfigKey::MASTER_KEY).await.unwrap(), "sealed");
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let store = SqliteStorage::open_in_memory().unwrap();

        store.insert(ConfigKey::MASTER_KEY, "first").await.unwrap();
        let err = store
            .insert(ConfigKey::MASTER_KEY, "second")
            .await
            .unwrap_err();

        assert!(matches!(err, WardenError::Conflict(_)));
        assert_eq!(store.get(ConfigKey::MASTER_KEY).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let store = SqliteStorage::open_in_memory().unwrap();

        store.save(ConfigKey::MASTER_KEY, "a").await.unwrap();
        store.save(ConfigKey::MASTER_KEY, "b").await.unwrap();

        assert_eq!(store.get(ConfigKey::MASTER_KEY).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = SqliteStorage::open_in_memory().unwrap();

        let err = store.get(ConfigKey::MASTER_KEY).await.unwrap_err();
        assert!(matches!(err, WardenError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = SqliteStorage::open(dir.path()).unwrap();
            store.insert(ConfigKey::MASTER_KEY, "persisted").await.unwrap();
        }

        assert!(dir.path().join(CONFIG_DB_FILE).exists());

        let store = SqliteStorage::open(dir.path()).unwrap();
        assert_eq!(
            store.get(ConfigKey::MASTER_KEY).await.unwrap(),
            "persisted"
        );
    }
}
