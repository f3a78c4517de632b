//! Error types for the apostila renderer

use thiserror::Error;

/// Main error type for renderer, editor and persistence operations
#[derive(Debug, Error)]
pub enum ApostilaError {
    /// Input could not be turned into mountable content
    #[error("could not parse document: {0}")]
    ParseFailure(String),

    /// Edit, listen or toggle target is missing from the document
    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// Transport or storage error while reading or writing a document
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// No storage identity, or the store reported zero affected rows
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The same operation is already in flight
    #[error("operation already in progress: {0}")]
    ConcurrencyGuard(&'static str),

    /// Commit or cancel on a session that is no longer the active one
    #[error("no active edit session for section {0}")]
    NoActiveEdit(String),

    /// Clipboard write failed
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// Invalid renderer or gateway configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApostilaError {
    /// Whether re-attempting the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }

    /// Whether the error should be swallowed instead of shown
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::ConcurrencyGuard(_))
    }

    /// Message to show the reader, or `None` when the failure is a silent no-op
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            Self::ConcurrencyGuard(_) => return None,
            Self::ParseFailure(_) => "This study guide has no readable content.".to_string(),
            Self::SectionNotFound(key) => format!("Section \"{key}\" was not found in this study guide."),
            Self::PersistenceFailure(_) => "Could not reach the server. Please try again.".to_string(),
            Self::PermissionDenied(_) => "You are not allowed to change this study guide.".to_string(),
            Self::NoActiveEdit(_) => "This edit was already closed.".to_string(),
            Self::Clipboard(_) => "Could not copy the link.".to_string(),
            Self::Config(reason) => format!("Invalid configuration: {reason}"),
            Self::Io(e) => format!("Could not access file: {e}"),
        };
        Some(message)
    }
}

impl From<reqwest::Error> for ApostilaError {
    fn from(err: reqwest::Error) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}

/// Convenience Result type for apostila operations
pub type Result<T> = std::result::Result<T, ApostilaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(ApostilaError::PersistenceFailure("timeout".into()).is_retryable());
        assert!(!ApostilaError::PermissionDenied("0 rows".into()).is_retryable());
        assert!(!ApostilaError::SectionNotFound("intro".into()).is_retryable());
    }

    #[test]
    fn test_concurrency_guard_is_silent() {
        let err = ApostilaError::ConcurrencyGuard("share");
        assert!(err.is_silent());
        assert_eq!(err.user_message(), None);
    }

    #[test]
    fn test_user_message_names_missing_section() {
        let message = ApostilaError::SectionNotFound("exercises".into())
            .user_message()
            .unwrap();
        assert!(message.contains("exercises"));
    }
}
