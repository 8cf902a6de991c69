//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants follow the failure taxonomy of the confidential field store:
/// - [`ServiceError::Configuration`] is fatal at startup.
/// - [`ServiceError::Encoding`] and [`ServiceError::Decryption`] mean stored
///   data cannot be turned back into plaintext with the current key.
/// - [`ServiceError::Storage`] is the only retryable variant.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The master secret is missing or shorter than the minimum length.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored value is not a well-formed envelope (bad base64, truncated,
    /// or not UTF-8 once opened).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The envelope failed authentication: tampered, corrupted, or sealed
    /// under a different master secret.
    #[error("decryption failed")]
    Decryption,

    /// No record with this id exists for the requesting owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller supplied a value the service refuses to store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns `true` if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_is_retryable() {
        assert!(ServiceError::Storage("timeout".into()).is_retryable());
        assert!(!ServiceError::Configuration("x".into()).is_retryable());
        assert!(!ServiceError::Encoding("x".into()).is_retryable());
        assert!(!ServiceError::Decryption.is_retryable());
        assert!(!ServiceError::NotFound("x".into()).is_retryable());
        assert!(!ServiceError::InvalidInput("x".into()).is_retryable());
        assert!(!ServiceError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::Configuration("ENCRYPTION_KEY is required".into());
        assert!(e.to_string().contains("ENCRYPTION_KEY is required"));
    }

    #[test]
    fn decryption_display_carries_no_detail() {
        assert_eq!(ServiceError::Decryption.to_string(), "decryption failed");
    }
}
