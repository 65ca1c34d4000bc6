//! Durable trace buffers for perfgate
//!
//! This crate implements the buffering half of delivery:
//! - TraceBuffer: store / count / paged read / delete / clear contract
//! - Chunks: lazy chunked traversal over any TraceBuffer
//! - FileBuffer: one JSON envelope file per record
//! - TableBuffer: one SQLite row per record
//! - BufferBackend: the closed set of backends, chosen by sending mode

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod file;
pub mod table;
pub mod traits;

pub use backend::BufferBackend;
pub use error::{BufferError, BufferResult};
pub use file::FileBuffer;
pub use table::TableBuffer;
pub use traits::{Chunks, TraceBuffer, TraceBufferExt};
