//! Fixed-size symmetric keys.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{Result, WardenError};

use super::REDACTED;

/// Length of a [`SecretKey`] in bytes (256-bit).
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key.
///
/// Every formatting or serialization path yields [`REDACTED`]; the raw value
/// is only reachable through [`SecretKey::as_bytes`] and [`SecretKey::to_base64`].
/// The bytes are zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a key from exactly [`KEY_LEN`] raw bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = raw.try_into().map_err(|_| WardenError::InvalidKeySize {
            expected: KEY_LEN,
            actual: raw.len(),
        })?;
        Ok(Self { bytes })
    }

    pub(crate) fn from_array(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Decode an unpadded standard base64 string.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut raw = BASE64
            .decode(encoded)
            .map_err(|e| WardenError::BadRequest(format!("invalid key encoding: {e}")))?;
        let key = Self::from_raw(&raw).map_err(WardenError::into_malformed);
        raw.zeroize();
        key
    }

    /// Unpadded standard base64 of the raw bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// The raw key material.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Constant-time comparison over the full key length.
    pub fn equals(&self, other: &SecretKey) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&REDACTED).finish()
    }
}

impl FromStr for SecretKey {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base64(s)
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut encoded = String::deserialize(deserializer)?;
        let key = Self::from_base64(&encoded).map_err(serde::de::Error::custom);
        encoded.zeroize();
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let k1 = SecretKey::generate();
        let k2 = SecretKey::generate();

        assert!(!k1.equals(&k2));
        assert_eq!(k1.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn test_from_raw_rejects_wrong_size() {
        let err = SecretKey::from_raw(&[7u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            WardenError::InvalidKeySize {
                expected: 32,
                actual: 16
            }
        ));

        assert!(SecretKey::from_raw(&[7u8; 33]).is_err());
        assert!(SecretKey::from_raw(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_base64_round_trip() {
        let key = SecretKey::generate();
        let decoded = SecretKey::from_base64(&key.to_base64()).unwrap();

        assert!(key.equals(&decoded));
        assert_eq!(key.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = SecretKey::from_base64("not base64 at all!").unwrap_err();
        assert!(matches!(err, WardenError::BadRequest(_)));

        // Valid base64, wrong decoded length
        let err = SecretKey::from_base64(&BASE64.encode([1u8; 12])).unwrap_err();
        assert!(matches!(
            err,
            WardenError::MalformedKey {
                expected: KEY_LEN,
                actual: 12
            }
        ));
        assert_eq!(err.kind(), crate::types::ErrorKind::BadRequest);
    }

    #[test]
    fn test_equals_compares_every_byte() {
        let key = SecretKey::from_raw(&[9u8; KEY_LEN]).unwrap();

        let mut last_differs = [9u8; KEY_LEN];
        last_differs[KEY_LEN - 1] = 8;
        let other = SecretKey::from_raw(&last_differs).unwrap();

        assert!(!key.equals(&other));
        assert!(key.equals(&key.clone()));
    }

    #[test]
    fn test_redacted_everywhere() {
        let key = SecretKey::generate();
        let b64 = key.to_base64();

        assert_eq!(key.to_string(), REDACTED);
        assert_eq!(format!("{key:?}"), format!("SecretKey({REDACTED:?})"));
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            format!("\"{REDACTED}\"")
        );
        assert!(!format!("{key} {key:?}").contains(&b64));
    }

    #[test]
    fn test_deserialize_from_base64() {
        let key = SecretKey::generate();
        let json = format!("\"{}\"", key.to_base64());

        let parsed: SecretKey = serde_json::from_str(&json).unwrap();
        assert!(parsed.equals(&key));

        let parsed: SecretKey = key.to_base64().parse().unwrap();
        assert!(parsed.equals(&key));
    }
}
