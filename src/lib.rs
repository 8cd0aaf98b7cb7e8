//! Keywarden - master key custody
//!
//! Keywarden manages the lifecycle of a single master key: registration under
//! a passphrase, unlock at startup (interactively or from a one-shot
//! credential file), and sealing/opening of other keys with it.
//!
//! ## Modules
//!
//! - **secret**: redacting wrappers for keys, sealed keys and passphrases
//! - **store**: key/value config storage (in-memory, SQLite)
//! - **masterkey**: key derivation, guarded memory and the manager state machine
//! - **config**: CLI arguments

pub mod config;
pub mod masterkey;
pub mod secret;
pub mod store;
pub mod types;

pub use config::Args;
pub use masterkey::{MasterKeyManager, MasterKeyService, MasterKeyState};
pub use types::{ErrorKind, Result, WardenError};
