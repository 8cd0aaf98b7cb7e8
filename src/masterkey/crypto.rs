//! Password-based key derivation for the master key record.
//!
//! # Algorithms
//!
//! - **Key Derivation**: Argon2id (memory-hard, brute-force resistant)
//! - **Sealing**: XChaCha20-Poly1305 (see [`crate::secret::SealedKey`])
//!
//! # Security Parameters
//!
//! Default Argon2id parameters target interactive unlock latency:
//! - 32 MB memory
//! - 3 iterations
//! - 4 parallelism lanes
//!
//! The parameters are part of the installation: changing them makes the
//! stored master key record impossible to open.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::secret::{SecretKey, SecretText, KEY_LEN};
use crate::types::{Result, WardenError};

// =============================================================================
// Constants
// =============================================================================

/// Argon2id memory cost in KiB (32 MB)
pub const ARGON2_MEMORY_KB: u32 = 32 * 1024;

/// Argon2id iteration count
pub const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id parallelism (lanes)
pub const ARGON2_PARALLELISM: u32 = 4;

/// Minimum salt length accepted by Argon2
pub const MIN_SALT_LEN: usize = 8;

// =============================================================================
// Parameters
// =============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl KdfParams {
    /// Minimal-cost parameters. Only for tests; far too weak for real passphrases.
    pub fn light() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_KB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

// =============================================================================
// Random bytes
// =============================================================================

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

// =============================================================================
// Key Derivation
// =============================================================================

/// Derive a 256-bit key encryption key from a passphrase using Argon2id.
///
/// The result seals and opens the master key record. CPU-bound and not
/// interruptible; run it off the async executor.
///
/// # Errors
///
/// - `BadRequest` for an empty passphrase
/// - `Internal` for invalid parameters or a salt shorter than [`MIN_SALT_LEN`]
pub fn derive_key_encryption_key(
    passphrase: &SecretText,
    salt: &[u8],
    params: &KdfParams,
) -> Result<SecretKey> {
    if passphrase.is_empty() {
        return Err(WardenError::BadRequest("passphrase must not be empty".into()));
    }

    if salt.len() < MIN_SALT_LEN {
        return Err(WardenError::Internal(format!(
            "Key derivation salt too short: {} bytes",
            salt.len()
        )));
    }

    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| WardenError::Internal(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; KEY_LEN];
    let derived = argon2
        .hash_password_into(passphrase.raw().as_bytes(), salt, &mut key)
        .map_err(|e| WardenError::Internal(format!("Key derivation failed: {e}")));

    let result = derived.map(|()| SecretKey::from_array(key));
    key.zeroize();
    result
}

// =============================================================================
// Tests
// =============================================================================
