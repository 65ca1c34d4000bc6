//! Capture errors.

use perfgate_core::ConfigError;
use perfgate_delivery::DeliveryError;
use thiserror::Error;

/// Errors on the capture path.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Profiler built from bad configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Capture was decided but the instrumentation engine is not loaded
    #[error("profiling was requested but the instrumentation engine is not available")]
    EngineUnavailable,

    /// Delivery failed; only surfaced when `debug` is set
    #[error("trace delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Result type for capture operations.
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
