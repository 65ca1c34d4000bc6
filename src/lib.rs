//! # perfgate
//!
//! Capture-and-delivery core for an application profiler.
//!
//! perfgate decides which units of work (HTTP requests, console commands,
//! queued jobs, scheduled tasks, exceptions) get profiled, and moves the
//! resulting opaque traces to a remote collector, either immediately or
//! through a durable buffer that a separate drain pass empties in chunks.
//!
//! ## Quick Start
//!
//! ```ignore
//! use perfgate::prelude::*;
//!
//! let config = Config::load("perfgate.toml")?.with_env_overrides()?;
//! config.validate()?;
//!
//! let sink = TraceSink::from_config(&config, HttpSender::from_config(&config)?)?;
//! let profiler = Profiler::new(&config, MemoryEngine::new(), sink)?;
//!
//! if let Some(mut session) = profiler.begin(&Subject::console("reports:build"), None)? {
//!     session.set_exit_code(0);
//!     session.finish()?;
//! }
//!
//! // Later, in a single drain process:
//! if let Some(buffer) = BufferBackend::from_config(&config)? {
//!     let report = DrainEngine::default().drain(&buffer, &HttpSender::from_config(&config)?)?;
//!     println!("synced {}", report.synced());
//! }
//! ```
//!
//! ## Crates
//!
//! - [`perfgate_core`]: configuration, filters, sampling, capture decision
//! - [`perfgate_buffer`]: file and SQLite trace buffers
//! - [`perfgate_delivery`]: senders, capture-time sink, drain engine
//! - [`perfgate_capture`]: subjects, span naming, capture sessions

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

pub use perfgate_buffer::{
    BufferBackend, BufferError, BufferResult, FileBuffer, TableBuffer, TraceBuffer, TraceBufferExt,
};
pub use perfgate_capture::{
    CaptureError, CaptureSession, Delivery, Engine, HttpSubject, MemoryEngine, Profiler,
    QueueSubject, RouteInfo, Subject,
};
pub use perfgate_core::{
    matches, CapturePolicy, Config, ConfigError, FilterPattern, FilterSet, ProfilingDecision,
    RecordId, SampleRate, SamplingGate, SendingMode, SubjectKind, TraceRecord,
};
pub use perfgate_delivery::{
    sender_fn, ChunkSummary, Delivered, DeliveryError, DrainEngine, DrainError, DrainFailure,
    DrainReport, HttpSender, SendError, Sender, TraceSink, DEFAULT_CHUNK_SIZE,
};
