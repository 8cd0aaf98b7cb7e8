//! Secret value types
//!
//! Wrappers that keep secret material out of logs, error messages and API
//! responses. Every `Display`, `Debug` and `Serialize` path yields the
//! [`REDACTED`] placeholder; the raw value is only reachable through an
//! explicit accessor.
//!
//! - [`SecretKey`]: 256-bit symmetric key, zeroized on drop
//! - [`SealedKey`]: a `SecretKey` sealed under another key (XChaCha20-Poly1305)
//! - [`SecretText`]: variable-length secret string (passphrases)

pub mod key;
pub mod sealed;
pub mod text;

pub use key::{SecretKey, KEY_LEN};
pub use sealed::{SealedKey, AUTH_TAG_LEN, NONCE_LEN, SEALED_KEY_LEN};
pub use text::SecretText;

/// Placeholder written instead of any secret value.
pub const REDACTED: &str = "*****";
