//! Master Key Service
//!
//! Owns the lifecycle of the master key, the single symmetric key that
//! protects every other secret at rest.
//!
//! # States
//!
//! ```text
//! NotRegistered --generate--> RegisteredUnlocked
//! RegisteredLocked --load----> RegisteredUnlocked
//! ```
//!
//! `RegisteredUnlocked` is terminal for the process. A restart always comes
//! back `RegisteredLocked`.
//!
//! # Storage
//!
//! The master key is stored sealed under a key derived from the passphrase.
//! The derivation salt is the nonce at the head of the stored envelope, so
//! no separate salt is persisted.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::secret::{SealedKey, SecretKey, SecretText, NONCE_LEN};
use crate::store::{ConfigService, ConfigStorage};
use crate::types::{Result, WardenError};

use super::credentials::CredentialsReader;
use super::crypto::{derive_key_encryption_key, generate_random_bytes, KdfParams};
use super::enclave::Enclave;

/// Passphrase used for the master key auto-registered in development mode.
pub const DEV_PASSPHRASE: &str = "keywarden-dev-password";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct MasterKeyConfig {
    /// Auto-register a master key with [`DEV_PASSPHRASE`] on an empty store
    pub dev_mode: bool,

    /// Argon2id cost. Fixed for the lifetime of an installation.
    pub kdf: KdfParams,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKeyState {
    NotRegistered,
    RegisteredLocked,
    RegisteredUnlocked,
}

impl MasterKeyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRegistered => "not-registered",
            Self::RegisteredLocked => "locked",
            Self::RegisteredUnlocked => "unlocked",
        }
    }
}

impl std::fmt::Display for MasterKeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Service trait
// =============================================================================

/// Operations the rest of the application uses to reach the master key.
#[async_trait]
pub trait MasterKeyService: Send + Sync {
    /// Whether the master key is decrypted in memory. No I/O.
    fn is_master_key_loaded(&self) -> bool;

    /// Whether a master key record exists in storage.
    async fn is_master_key_registered(&self) -> Result<bool>;

    /// Create, persist and load a new master key protected by `passphrase`.
    async fn generate_master_key(&self, passphrase: &SecretText) -> Result<()>;

    /// Decrypt the stored master key with `passphrase` and load it.
    async fn load_master_key_from_password(&self, passphrase: &SecretText) -> Result<()>;

    /// Seal `key` under the master key.
    fn seal_key(&self, key: &SecretKey) -> Result<SealedKey>;

    /// Open a key sealed under the master key.
    fn open(&self, sealed: &SealedKey) -> Result<SecretKey>;
}

// =============================================================================
// Manager
// =============================================================================

pub struct MasterKeyManager {
    config: ConfigService,
    credentials: CredentialsReader,
    settings: MasterKeyConfig,

    /// Set once on the first successful generate or unlock
    enclave: OnceLock<Enclave>,
}

impl MasterKeyManager {
    /// Create a locked manager. No I/O.
    pub fn new(
        storage: Arc<dyn ConfigStorage>,
        credentials: CredentialsReader,
        settings: MasterKeyConfig,
    ) -> Self {
        Self {
            config: ConfigService::new(storage),
            credentials,
            settings,
            enclave: OnceLock::new(),
        }
    }

    /// Create a manager and run the startup sequence: dev-mode registration,
    /// then the credential bootstrap. A missing credentials directory is not
    /// an error; the key then waits for an interactive unlock.
    pub async fn init(
        storage: Arc<dyn ConfigStorage>,
        credentials: CredentialsReader,
        settings: MasterKeyConfig,
    ) -> Result<Self> {
        let manager = Self::new(storage, credentials, settings);

        if settings.dev_mode && !manager.is_master_key_registered().await? {
            warn!("No master key found in dev mode, registering one with the development passphrase");
            manager
                .register(&SecretText::new(DEV_PASSPHRASE), false)
                .await?;
        }

        match manager.bootstrap_from_credentials().await {
            Ok(()) => {}
            Err(WardenError::CredentialsDirNotSet) => {
                warn!("No credentials directory configured, the master password must be set manually");
            }
            Err(e) => return Err(e),
        }

        Ok(manager)
    }

    /// Consume the credential file and use it to register or unlock the
    /// master key, depending on whether a record exists.
    pub async fn bootstrap_from_credentials(&self) -> Result<()> {
        let password = self.credentials.take_password().await?;

        if self.is_master_key_registered().await? {
            info!("Unlocking master key from credentials");
            self.load_master_key_from_password(&password).await
        } else {
            info!("Registering master key from credentials");
            self.generate_master_key(&password).await
        }
    }

    /// Current lifecycle state. Only touches storage while locked.
    pub async fn state(&self) -> Result<MasterKeyState> {
        if self.is_master_key_loaded() {
            return Ok(MasterKeyState::RegisteredUnlocked);
        }

        if self.is_master_key_registered().await? {
            Ok(MasterKeyState::RegisteredLocked)
        } else {
            Ok(MasterKeyState::NotRegistered)
        }
    }

    async fn derive_pass_key(
        &self,
        passphrase: &SecretText,
        salt: [u8; NONCE_LEN],
    ) -> Result<SecretKey> {
        let passphrase = passphrase.clone();
        let params = self.settings.kdf;

        tokio::task::spawn_blocking(move || {
            derive_key_encryption_key(&passphrase, &salt, &params)
        })
        .await?
    }

    /// Seal a fresh master key and persist it. With `publish`, the key is
    /// also loaded into the enclave.
    async fn register(&self, passphrase: &SecretText, publish: bool) -> Result<()> {
        if passphrase.is_empty() {
            return Err(WardenError::BadRequest("passphrase must not be empty".into()));
        }

        if self.is_master_key_registered().await? {
            return Err(WardenError::AlreadyExists);
        }

        let nonce: [u8; NONCE_LEN] = generate_random_bytes();
        let pass_key = self.derive_pass_key(passphrase, nonce).await?;

        let master_key = SecretKey::generate();
        let sealed = SealedKey::seal_with_nonce(&pass_key, &master_key, &nonce)?;

        // Storage rejects a second insert, so a concurrent generator loses here.
        self.config.register_master_key(&sealed).await?;
        info!("Master key registered");

        if publish {
            self.publish(master_key)?;
        }
        Ok(())
    }

    fn publish(&self, master_key: SecretKey) -> Result<()> {
        self.enclave
            .set(Enclave::new(master_key))
            .map_err(|_| WardenError::AlreadyDeciphered)?;
        info!("Master key loaded");
        Ok(())
    }

    fn enclave(&self) -> Result<&Enclave> {
        self.enclave.get().ok_or(WardenError::MasterKeyUnavailable)
    }
}

impl std::fmt::Debug for MasterKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyManager")
            .field("loaded", &self.is_master_key_loaded())
            .field("credentials", &self.credentials)
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl MasterKeyService for MasterKeyManager {
    fn is_master_key_loaded(&self) -> bool {
        self.enclave.get().is_some()
    }

    async fn is_master_key_registered(&self) -> Result<bool> {
        match self.config.get_master_key().await {
            Ok(_) => Ok(true),
            Err(WardenError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn generate_master_key(&self, passphrase: &SecretText) -> Result<()> {
        self.register(passphrase, true).await
    }

    async fn load_master_key_from_password(&self, passphrase: &SecretText) -> Result<()> {
        if self.is_master_key_loaded() {
            return Err(WardenError::AlreadyDeciphered);
        }

        if passphrase.is_empty() {
            return Err(WardenError::BadRequest("passphrase must not be empty".into()));
        }

        let sealed = self.config.get_master_key().await.map_err(|e| match e {
            WardenError::NotFound(_) => WardenError::MasterKeyNotFound,
            other => other,
        })?;

        let pass_key = self.derive_pass_key(passphrase, sealed.nonce()).await?;

        let master_key = match sealed.open(&pass_key) {
            Ok(key) => key,
            Err(WardenError::OpenFailed) => {
                debug!("Master key unlock rejected");
                return Err(WardenError::InvalidPassword);
            }
            Err(e) => return Err(e),
        };

        self.publish(master_key)
    }

    fn seal_key(&self, key: &SecretKey) -> Result<SealedKey> {
        self.enclave()?
            .open(|master_key| SealedKey::seal(master_key, key))
    }

    fn open(&self, sealed: &SealedKey) -> Result<SecretKey> {
        self.enclave()?.open(|master_key| sealed.open(master_key))
    }
}

// =============================================================================
// Tests
// =============================================================================
