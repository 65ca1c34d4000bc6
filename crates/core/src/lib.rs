//! Core types and capture decision logic for perfgate
//!
//! This crate holds everything that is pure and shared:
//! - TraceRecord / RecordId: the unit stored in a buffer and delivered
//! - Config: the immutable configuration value passed to every component
//! - FilterSet / matches: the include/exclude pattern language
//! - SamplingGate: probabilistic per-invocation gate
//! - ProfilingDecision: composes the above into "capture or not"

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decision;
pub mod error;
pub mod filter;
pub mod sampling;
pub mod types;

pub use config::{
    Config, DatabaseSettings, FileSettings, SendingConfig, SendingMode, SubjectFilters,
};
pub use decision::{CapturePolicy, ProfilingDecision};
pub use error::{ConfigError, ConfigResult};
pub use filter::{matches, FilterPattern, FilterSet};
pub use sampling::{SampleRate, SamplingGate};
pub use types::{RecordId, SubjectKind, TraceRecord};
