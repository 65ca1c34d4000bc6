//! Capture side of perfgate.
//!
//! A [`Profiler`] is built once from the configuration. For every unit of
//! work it decides whether to capture, and if so hands out a
//! [`CaptureSession`] that owns the engine span until the work finishes.
//!
//! ```ignore
//! let profiler = Profiler::new(&config, engine, sink)?;
//! if let Some(mut session) = profiler.begin(&Subject::console("migrate"), None)? {
//!     run_migrations();
//!     session.set_exit_code(0);
//!     session.finish()?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
mod error;
mod profiler;
mod subject;

pub use engine::{Engine, MemoryEngine};
pub use error::{CaptureError, CaptureResult};
pub use profiler::{CaptureSession, Delivery, Profiler};
pub use subject::{ConsoleSubject, HttpSubject, QueueSubject, RouteInfo, Subject};
