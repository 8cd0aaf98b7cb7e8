//! Master key custody
//!
//! The master key seals every other secret. It is stored sealed under a
//! passphrase-derived key (Argon2id) and, once unlocked, held in a guarded
//! in-memory [`Enclave`] for the rest of the process.
//!
//! ## Modules
//!
//! - [`crypto`]: Argon2id key derivation
//! - [`enclave`]: guarded holder for the decrypted key
//! - [`credentials`]: one-shot credential file for unattended starts
//! - [`service`]: [`MasterKeyManager`] state machine
//! - [`gate`]: redirect decision for HTTP front ends

pub mod credentials;
pub mod crypto;
pub mod enclave;
pub mod gate;
pub mod service;

pub use credentials::{CredentialsReader, CREDENTIALS_ENV, PASSWORD_FILE};
pub use crypto::{derive_key_encryption_key, KdfParams};
pub use enclave::Enclave;
pub use gate::{GateDecision, MasterKeyGate, ASK_PASSWORD_PATH, REGISTER_PASSWORD_PATH};
pub use service::{
    MasterKeyConfig, MasterKeyManager, MasterKeyService, MasterKeyState, DEV_PASSPHRASE,
};
