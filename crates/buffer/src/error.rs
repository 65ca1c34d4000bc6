//! Buffer errors.

use perfgate_core::{ConfigError, RecordId};
use thiserror::Error;

/// Errors from trace buffer backends.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored record could not be decoded
    #[error("corrupt record {id}: {reason}")]
    Corrupt {
        /// Record id
        id: RecordId,
        /// What was wrong with it
        reason: String,
    },

    /// Envelope could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend constructed with bad settings
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for buffer operations.
pub type BufferResult<T> = std::result::Result<T, BufferError>;

impl From<serde_json::Error> for BufferError {
    fn from(e: serde_json::Error) -> Self {
        BufferError::Serialization(e.to_string())
    }
}
