//! Authenticated sealing of one [`SecretKey`] under another.
//!
//! # Envelope
//!
//! ```text
//! nonce (24 bytes) || XChaCha20-Poly1305(key, 32 bytes) || tag (16 bytes)
//! ```
//!
//! Every envelope is exactly [`SEALED_KEY_LEN`] bytes. Opening under the wrong
//! key and opening tampered bytes fail with the same [`WardenError::OpenFailed`].

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::types::{Result, WardenError};

use super::key::{SecretKey, KEY_LEN};
use super::REDACTED;

/// Nonce length for XChaCha20-Poly1305 (24 bytes)
pub const NONCE_LEN: usize = 24;

/// Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Total envelope length.
pub const SEALED_KEY_LEN: usize = NONCE_LEN + KEY_LEN + AUTH_TAG_LEN;

/// A [`SecretKey`] sealed under an encryption key.
#[derive(Clone)]
pub struct SealedKey {
    bytes: [u8; SEALED_KEY_LEN],
}

impl SealedKey {
    /// Seal `input` under `encryption_key` with a fresh random nonce.
    pub fn seal(encryption_key: &SecretKey, input: &SecretKey) -> Result<Self> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        Self::seal_with_nonce(encryption_key, input, &nonce)
    }

    /// Seal with a caller-provided nonce. The nonce must never be reused
    /// with the same encryption key.
    pub(crate) fn seal_with_nonce(
        encryption_key: &SecretKey,
        input: &SecretKey,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Self> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(encryption_key.as_bytes()));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(nonce), input.as_bytes().as_slice())
            .map_err(|e| WardenError::Internal(format!("failed to seal the key: {e}")))?;

        if NONCE_LEN + ciphertext.len() != SEALED_KEY_LEN {
            return Err(WardenError::InvalidKeySize {
                expected: SEALED_KEY_LEN,
                actual: NONCE_LEN + ciphertext.len(),
            });
        }

        let mut bytes = [0u8; SEALED_KEY_LEN];
        bytes[..NONCE_LEN].copy_from_slice(nonce);
        bytes[NONCE_LEN..].copy_from_slice(&ciphertext);
        Ok(Self { bytes })
    }

    /// Authenticate and decrypt the envelope.
    pub fn open(&self, encryption_key: &SecretKey) -> Result<SecretKey> {
        let (nonce, ciphertext) = self.bytes.split_at(NONCE_LEN);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(encryption_key.as_bytes()));
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(XNonce::from_slice(nonce), ciphertext)
                .map_err(|_| WardenError::OpenFailed)?,
        );

        if plaintext.len() != KEY_LEN {
            return Err(WardenError::InvalidKeySize {
                expected: KEY_LEN,
                actual: plaintext.len(),
            });
        }

        SecretKey::from_raw(&plaintext)
    }

    /// Nonce prefix of the envelope.
    pub fn nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&self.bytes[..NONCE_LEN]);
        nonce
    }

    /// Build from exactly [`SEALED_KEY_LEN`] raw bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; SEALED_KEY_LEN] =
            raw.try_into().map_err(|_| WardenError::InvalidKeySize {
                expected: SEALED_KEY_LEN,
                actual: raw.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Decode an unpadded standard base64 string. The decoded length is
    /// checked before any cryptographic step.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| WardenError::BadRequest(format!("invalid sealed key encoding: {e}")))?;
        Self::from_raw(&raw).map_err(WardenError::into_malformed)
    }

    /// Unpadded standard base64 of the envelope.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// The raw envelope bytes.
    pub fn as_bytes(&self) -> &[u8; SEALED_KEY_LEN] {
        &self.bytes
    }

    /// Constant-time comparison over the full envelope.
    pub fn equals(&self, other: &SealedKey) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl fmt::Display for SealedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for SealedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SealedKey").field(&REDACTED).finish()
    }
}

impl FromStr for SealedKey {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base64(s)
    }
}

impl Serialize for SealedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SealedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
