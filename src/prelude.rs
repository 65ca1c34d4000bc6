//! Convenient imports for perfgate.
//!
//! ```ignore
//! use perfgate::prelude::*;
//! ```

// Error handling
pub use crate::error::{Error, Result};

// Configuration and decision
pub use perfgate_core::{Config, RecordId, SampleRate, SendingMode, SubjectKind};

// Buffers
pub use perfgate_buffer::{BufferBackend, TraceBuffer, TraceBufferExt};

// Delivery
pub use perfgate_delivery::{DrainEngine, DrainReport, HttpSender, Sender, TraceSink};

// Capture
pub use perfgate_capture::{Delivery, Engine, MemoryEngine, Profiler, Subject};
