//! Delivery errors.

use perfgate_buffer::BufferError;
use perfgate_core::ConfigError;
use thiserror::Error;

/// A single submission failed.
///
/// Transient by nature: a drain pass stops on it and the next pass retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Network-level failure (DNS, connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-success status
    #[error("collector rejected trace with status {status}")]
    Rejected {
        /// HTTP status code
        status: u16,
    },

    /// Any other sender-specific failure
    #[error("{0}")]
    Other(String),
}

impl SendError {
    /// Build an [`SendError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        SendError::Other(message.into())
    }
}

/// Capture-time delivery failed (either mode).
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Immediate submission failed
    #[error(transparent)]
    Send(#[from] SendError),

    /// Storing into the buffer failed
    #[error(transparent)]
    Storage(#[from] BufferError),

    /// Sink could not be built
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A drain pass could not run or was cut short by the buffer itself.
///
/// Submission failures are not errors at this level; they are reported in
/// [`crate::DrainReport::failure`].
#[derive(Debug, Error)]
pub enum DrainError {
    /// Reading, deleting or committing failed
    #[error(transparent)]
    Storage(#[from] BufferError),

    /// Bad drain settings
    #[error(transparent)]
    Config(#[from] ConfigError),
}
