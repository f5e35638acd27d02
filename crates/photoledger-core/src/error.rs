//! Error types for the review engine.

use thiserror::Error;

/// Errors surfaced by fallible engine operations.
///
/// Most review operations are best-effort and log their failures instead;
/// these errors come from opening storage, loading settings and explicit
/// maintenance such as group resets.
#[derive(Debug, Error)]
pub enum Error {
    /// Review state database failed.
    #[error("Review database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A settings file or state blob could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Settings or data directory I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings are unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Engine result type.
pub type Result<T> = std::result::Result<T, Error>;
