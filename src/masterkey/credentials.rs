//! One-shot credential file reader.
//!
//! Unattended starts receive the master passphrase through a directory set in
//! `CREDENTIALS_DIRECTORY` (systemd `LoadCredential=`). The `password` file is
//! read once and deleted straight away so no plaintext copy lingers on disk.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::secret::SecretText;
use crate::types::{Result, WardenError};

/// Environment variable naming the credentials directory.
pub const CREDENTIALS_ENV: &str = "CREDENTIALS_DIRECTORY";

/// File holding the passphrase inside the credentials directory.
pub const PASSWORD_FILE: &str = "password";

#[derive(Debug, Clone, Default)]
pub struct CredentialsReader {
    dir: Option<PathBuf>,
}

impl CredentialsReader {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn is_configured(&self) -> bool {
        self.dir.is_some()
    }

    /// Read the passphrase and delete the file.
    ///
    /// Fails with [`WardenError::CredentialsDirNotSet`] when no directory is
    /// configured; callers may treat that as "fall back to interactive unlock".
    pub async fn take_password(&self) -> Result<SecretText> {
        let dir = self.dir.as_ref().ok_or(WardenError::CredentialsDirNotSet)?;
        let path = dir.join(PASSWORD_FILE);

        let raw = tokio::fs::read(&path).await.map_err(|e| {
            WardenError::Internal(format!(
                "failed to open the credentials file {}: {e}",
                path.display()
            ))
        })?;

        tokio::fs::remove_file(&path).await.map_err(|e| {
            WardenError::Internal(format!(
                "failed to remove the credentials file {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "Credentials file consumed");

        let mut text = String::from_utf8(raw).map_err(|_| {
            WardenError::BadRequest("credentials file is not valid UTF-8".into())
        })?;
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }

        let password = SecretText::new(text);
        if password.is_empty() {
            return Err(WardenError::BadRequest("credentials file is empty".into()));
        }

        info!(dir = %dir.display(), "Master password loaded from credentials directory");
        Ok(password)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_unconfigured() {
        let reader = CredentialsReader::new(None);

        assert!(!reader.is_configured());
        let err = reader.take_password().await.unwrap_err();
        assert!(matches!(err, WardenError::CredentialsDirNotSet));
    }

    #[tokio::test]
    async fn test_reads_then_deletes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PASSWORD_FILE);
        std::fs::write(&path, "hunter2\n").unwrap();

        let reader = CredentialsReader::new(Some(dir.path().to_path_buf()));
        let password = reader.take_password().await.unwrap();

        assert_eq!(password.raw(), "hunter2");
        assert!(!path.exists());

        // Single consumption
        let err = reader.take_password().await.unwrap_err();
        assert!(matches!(err, WardenError::Internal(_)));
    }

    #[tokio::test]
    async fn test_only_one_newline_stripped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PASSWORD_FILE), "pass word \n\n").unwrap();

        let reader = CredentialsReader::new(Some(dir.path().to_path_buf()));
        let password = reader.take_password().await.unwrap();

        assert_eq!(password.raw(), "pass word \n");
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PASSWORD_FILE), "\n").unwrap();

        let reader = CredentialsReader::new(Some(dir.path().to_path_buf()));
        let err = reader.take_password().await.unwrap_err();

        assert!(matches!(err, WardenError::BadRequest(_)));
        assert!(!dir.path().join(PASSWORD_FILE).exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_internal() {
        let dir = TempDir::new().unwrap();

        let reader = CredentialsReader::new(Some(dir.path().to_path_buf()));
        let err = reader.take_password().await.unwrap_err();

        assert!(matches!(err, WardenError::Internal(_)));
    }
}
