//! Error types for dayline-core

use thiserror::Error;

use crate::util::compact_text;

/// Result type alias using dayline-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dayline-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Read-path failure talking to the remote store. Prior state is kept.
    #[error("Network error: {0}")]
    Network(String),

    /// A mutation was rejected or failed remotely. Local state was rolled back.
    #[error("Write failed: {0}")]
    Write(String),

    /// The identity merge did not complete. The pending marker is retained.
    #[error("Merge failed: {0}")]
    Merge(String),

    /// Entry text could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// No identity is bound to the coordinator
    #[error("No active session")]
    NoSession,

    /// Entry not found
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from a remote read that can simply be retried
    /// on the next refresh.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::LibSql(_))
    }

    /// Convert a remote failure into the write-path category.
    #[must_use]
    pub fn into_write_failure(self) -> Self {
        match self {
            Self::Write(_) | Self::NotFound(_) | Self::NoSession | Self::InvalidInput(_) => self,
            other => Self::Write(compact_text(&other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_transient() {
        assert!(Error::Network("timeout".to_string()).is_transient());
        assert!(!Error::Write("rejected".to_string()).is_transient());
        assert!(!Error::NoSession.is_transient());
    }

    #[test]
    fn test_remote_failures_become_write_failures() {
        let error = Error::Network("connection reset".to_string()).into_write_failure();
        assert!(matches!(error, Error::Write(message) if message.contains("connection reset")));

        let error = Error::NotFound("abc".to_string()).into_write_failure();
        assert!(matches!(error, Error::NotFound(_)));
    }
}
