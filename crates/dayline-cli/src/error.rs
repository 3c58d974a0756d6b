use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] dayline_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyContent,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("User id cannot be empty")]
    EmptyUserId,
    #[error("Entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Already signed in as {0}")]
    AlreadySignedIn(String),
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `dayline config set --database-url ... --auth-token ...`, or set DAYLINE_DATABASE_URL and DAYLINE_AUTH_TOKEN."
    )]
    SyncNotConfigured,
}
