//! Error types for Keywarden
//!
//! Every failure carries a kind (see [`ErrorKind`]) so callers can branch on
//! the class of error instead of matching message text.

use hyper::StatusCode;
use serde::Serialize;

/// Classification of a [`WardenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, wrong password, corrupt base64.
    BadRequest,
    /// A record that was expected in storage is missing.
    NotFound,
    /// The operation conflicts with existing state.
    Conflict,
    /// Storage, KDF or invariant failures.
    Internal,
    /// The master key is locked; retry after unlock.
    Unavailable,
}

/// Main error type for Keywarden operations
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error("invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("malformed key: expected {expected} bytes, got {actual}")]
    MalformedKey { expected: usize, actual: usize },

    #[error("failed to open the sealed key")]
    OpenFailed,

    #[error("invalid password")]
    InvalidPassword,

    #[error("master key not found")]
    MasterKeyNotFound,

    #[error("master key unavailable: unlock required")]
    MasterKeyUnavailable,

    #[error("a master key already exists")]
    AlreadyExists,

    #[error("the master key is already deciphered")]
    AlreadyDeciphered,

    #[error("credentials directory not set")]
    CredentialsDirNotSet,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeySize { .. } => ErrorKind::Internal,
            Self::MalformedKey { .. } => ErrorKind::BadRequest,
            Self::OpenFailed => ErrorKind::BadRequest,
            Self::InvalidPassword => ErrorKind::BadRequest,
            Self::MasterKeyNotFound => ErrorKind::BadRequest,
            Self::MasterKeyUnavailable => ErrorKind::Unavailable,
            Self::AlreadyExists => ErrorKind::Conflict,
            Self::AlreadyDeciphered => ErrorKind::Conflict,
            Self::CredentialsDirNotSet => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Internal,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Reclassify a size mismatch on decoded client input as malformed input.
    pub(crate) fn into_malformed(self) -> Self {
        match self {
            Self::InvalidKeySize { expected, actual } => Self::MalformedKey { expected, actual },
            other => other,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to hand to a client. Internal details are replaced by a
    /// generic message.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Convert to status code and JSON body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        #[derive(Serialize)]
        struct ErrorBody {
            message: String,
        }

        let status = self.status_code();
        let body = serde_json::to_string(&ErrorBody {
            message: self.public_message(),
        })
        .unwrap_or_else(|_| r#"{"message":"internal error"}"#.to_string());
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for WardenError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<rusqlite::Error> for WardenError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for WardenError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {}", err))
    }
}

/// Result type alias for Keywarden operations
pub type Result<T> = std::result::Result<T, WardenError>;
