//! Trace delivery for perfgate.
//!
//! A [`TraceSink`] decides at capture time whether a finished trace is
//! submitted immediately or stored in a buffer. A [`DrainEngine`] later moves
//! buffered traces to a [`Sender`] in bounded chunks with at-least-once
//! semantics.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod drain;
mod error;
mod sender;
mod sink;

pub use drain::{ChunkSummary, DrainEngine, DrainFailure, DrainReport, DEFAULT_CHUNK_SIZE};
pub use error::{DeliveryError, DrainError, SendError};
pub use sender::{sender_fn, FnSender, HttpSender, Sender};
pub use sink::{Delivered, TraceSink};
