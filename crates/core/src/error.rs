//! Configuration errors.
//!
//! Every variant here is fatal: a misconfigured system fails loudly at the
//! point of use instead of silently profiling nothing or dropping traces.

use thiserror::Error;

/// Errors raised while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sample rate outside [0.0, 1.0] (or NaN)
    #[error("sample_rate must be a decimal between 0.0 and 1.0, got {0}")]
    InvalidSampleRate(f64),

    /// A filter pattern could not be compiled
    #[error("invalid filter pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern as configured
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Path setting is empty or unusable
    #[error("invalid path for {setting}: {reason}")]
    InvalidPath {
        /// Name of the setting
        setting: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Table name is not a plain SQL identifier
    #[error("invalid table name {0:?}: expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTableName(String),

    /// File suffix is empty or contains a path separator
    #[error("invalid file suffix {0:?}")]
    InvalidSuffix(String),

    /// Chunk size of zero
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,

    /// Submission timeout of zero seconds
    #[error("sending.timeout must be at least 1 second")]
    InvalidTimeout,

    /// A setting required by the selected mode is absent
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    /// Environment override could not be parsed
    #[error("invalid value {value:?} for {variable}")]
    InvalidOverride {
        /// Environment variable name
        variable: &'static str,
        /// The raw value
        value: String,
    },

    /// Config file could not be parsed (includes malformed include/exclude
    /// lists and unknown sending modes)
    #[error("parse error: {0}")]
    Parse(String),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
