//! Error types for datanet.

use thiserror::Error;

/// Result type alias for datanet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datanet operations.
#[derive(Error, Debug)]
pub enum Error {
    // Canonicalization errors
    #[error("Canonicalization failed at {path}: {reason}")]
    Canonicalization { path: String, reason: String },

    // Comparator errors
    #[error("Invalid comparator input: {0}")]
    ComparatorInput(String),

    // Decision errors
    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Record integrity mismatch: expected {expected}, computed {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // Review errors
    #[error("Invalid transition for record {record_id}: {reason}")]
    InvalidTransition { record_id: String, reason: String },

    // Key and signature errors
    #[error("Key not found for identity: {0}")]
    KeyNotFound(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a canonicalization error for the value at `path`.
    pub fn canonicalization(path: &str, reason: impl Into<String>) -> Self {
        Error::Canonicalization {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a transition error for `record_id`.
    pub fn invalid_transition(record_id: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Error::InvalidTransition {
            record_id: record_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(_: ed25519_dalek::SignatureError) -> Self {
        Error::SignatureVerificationFailed
    }
}
