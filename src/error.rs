//! Unified error type for perfgate.
//!
//! Each crate has its own error enum; this one flattens them so callers of
//! the facade match on a single type.

use perfgate_buffer::BufferError;
use perfgate_capture::CaptureError;
use perfgate_core::ConfigError;
use perfgate_delivery::{DeliveryError, DrainError, SendError};
use thiserror::Error;

/// All perfgate errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (sample rate, pattern, path, table name, chunk size)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Buffer read, write, delete or commit failed
    #[error("storage error: {0}")]
    Storage(BufferError),

    /// A trace could not be submitted
    #[error("delivery error: {0}")]
    Send(#[from] SendError),

    /// Capture was decided but the instrumentation engine is not loaded
    #[error("instrumentation engine unavailable")]
    EngineUnavailable,
}

/// Result type for perfgate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Configuration problem; retrying will not help.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Buffer failure.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Submission failure.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Send(_))
    }

    /// Whether a later attempt may succeed.
    ///
    /// Submission failures are transient; the records stay buffered for the
    /// next drain pass.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Send(_))
    }
}

impl From<BufferError> for Error {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::Config(c) => Error::Config(c),
            other => Error::Storage(other),
        }
    }
}

impl From<DrainError> for Error {
    fn from(e: DrainError) -> Self {
        match e {
            DrainError::Storage(b) => b.into(),
            DrainError::Config(c) => Error::Config(c),
        }
    }
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Send(s) => Error::Send(s),
            DeliveryError::Storage(b) => b.into(),
            DeliveryError::Config(c) => Error::Config(c),
        }
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::Config(c) => Error::Config(c),
            CaptureError::EngineUnavailable => Error::EngineUnavailable,
            CaptureError::Delivery(d) => d.into(),
        }
    }
}
