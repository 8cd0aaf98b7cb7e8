//! Guarded in-memory holder for the decrypted master key.
//!
//! The key lives in its own heap allocation that stays put for the lifetime
//! of the enclave. On Unix the page range is pinned with `mlock(2)` so it is
//! never written to swap. Elsewhere, or when the process lacks the privilege
//! to lock memory, the enclave falls back to a plain buffer: the key is still
//! wiped on drop but may reach swap.
//!
//! Access is scoped: [`Enclave::open`] lends the key to a closure and the
//! borrow cannot escape it.

use std::fmt;

use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::secret::{SecretKey, KEY_LEN};

/// Owner of the decrypted master key.
pub struct Enclave {
    /// Boxed so the address handed to `mlock` stays stable across moves
    key: Box<SecretKey>,

    /// Whether the backing pages are locked in RAM
    locked: bool,
}

impl Enclave {
    /// Move `key` into a guarded allocation.
    pub fn new(key: SecretKey) -> Self {
        let key = Box::new(key);
        let locked = lock_memory(key.as_bytes());

        if locked {
            debug!("Master key memory locked");
        } else {
            warn!("Could not lock master key memory; it may be swapped to disk");
        }

        Self { key, locked }
    }

    /// Run `f` with a borrowed view of the key.
    pub fn open<R>(&self, f: impl FnOnce(&SecretKey) -> R) -> R {
        f(&self.key)
    }

    /// Whether the key is pinned in RAM.
    pub fn is_memory_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for Enclave {
    fn drop(&mut self) {
        self.key.zeroize();
        if self.locked {
            unlock_memory(self.key.as_bytes());
        }
    }
}

impl fmt::Debug for Enclave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enclave")
            .field("key", &self.key)
            .field("locked", &self.locked)
            .finish()
    }
}

// =============================================================================
// Platform memory locking
// =============================================================================

#[cfg(unix)]
fn lock_memory(bytes: &[u8; KEY_LEN]) -> bool {
    // SAFETY: the pointer and length describe a live, owned allocation.
    unsafe { libc::mlock(bytes.as_ptr().cast::<libc::c_void>(), KEY_LEN) == 0 }
}

#[cfg(unix)]
fn unlock_memory(bytes: &[u8; KEY_LEN]) {
    // SAFETY: same range that was passed to `mlock` in `lock_memory`.
    unsafe {
        libc::munlock(bytes.as_ptr().cast::<libc::c_void>(), KEY_LEN);
    }
}

#[cfg(not(unix))]
fn lock_memory(_bytes: &[u8; KEY_LEN]) -> bool {
    false
}

#[cfg(not(unix))]
fn unlock_memory(_bytes: &[u8; KEY_LEN]) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::REDACTED;

    #[test]
    fn test_open_lends_the_key() {
        let key = SecretKey::generate();
        let expected = *key.as_bytes();

        let enclave = Enclave::new(key);

        let seen = enclave.open(|k| *k.as_bytes());
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_open_returns_closure_result() {
        let enclave = Enclave::new(SecretKey::from_raw(&[7u8; KEY_LEN]).unwrap());

        let sum: u32 = enclave.open(|k| k.as_bytes().iter().map(|b| *b as u32).sum());
        assert_eq!(sum, 7 * KEY_LEN as u32);
    }

    #[test]
    fn test_debug_is_redacted() {
        let enclave = Enclave::new(SecretKey::from_raw(&[0xAB; KEY_LEN]).unwrap());

        let debug = format!("{enclave:?}");
        assert!(debug.contains(REDACTED));
        assert!(!debug.contains("171"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_then_drop() {
        let key = SecretKey::generate();
        let expected = *key.as_bytes();

        let enclave = Enclave::new(key);

        // mlock may be refused under a low RLIMIT_MEMLOCK; access works either way
        let scratch = [0u8; KEY_LEN];
        let can_lock = lock_memory(&scratch);
        if can_lock {
            unlock_memory(&scratch);
        }
        assert_eq!(enclave.is_memory_locked(), can_lock);
        assert!(enclave.open(|k| *k.as_bytes() == expected));

        drop(enclave);

        // A second enclave locks and unlocks independently
        let other = Enclave::new(SecretKey::from_raw(&[9u8; KEY_LEN]).unwrap());
        assert_eq!(other.open(|k| k.as_bytes()[0]), 9);
    }

    #[cfg(not(unix))]
    #[test]
    fn test_fallback_is_unlocked() {
        let enclave = Enclave::new(SecretKey::generate());
        assert!(!enclave.is_memory_locked());
    }
}
