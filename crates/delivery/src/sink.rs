//! Where a finished trace goes at capture time.

use crate::error::DeliveryError;
use crate::sender::Sender;
use perfgate_buffer::{BufferBackend, TraceBuffer};
use perfgate_core::{Config, RecordId};

/// Outcome of [`TraceSink::deliver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    /// Submitted immediately
    Sent,
    /// Stored for a later drain pass
    Stored(RecordId),
}

/// Direct submission or buffering, selected once from configuration.
#[derive(Debug)]
pub enum TraceSink<S, B = BufferBackend> {
    /// Submit inside the request lifecycle
    Direct(S),
    /// Store and let a drain pass submit later
    Buffered(B),
}

impl<S: Sender> TraceSink<S, BufferBackend> {
    /// Sink for the configured sending mode.
    ///
    /// `sender` is only kept in sync mode; buffered modes hand it to a
    /// [`crate::DrainEngine`] instead.
    pub fn from_config(config: &Config, sender: S) -> Result<Self, DeliveryError> {
        match BufferBackend::from_config(config)? {
            Some(backend) => Ok(TraceSink::Buffered(backend)),
            None => Ok(TraceSink::Direct(sender)),
        }
    }
}

impl<S: Sender, B: TraceBuffer> TraceSink<S, B> {
    /// Submit or store one payload.
    pub fn deliver(&self, payload: &[u8]) -> Result<Delivered, DeliveryError> {
        match self {
            TraceSink::Direct(sender) => {
                sender.submit(payload)?;
                Ok(Delivered::Sent)
            }
            TraceSink::Buffered(buffer) => Ok(Delivered::Stored(buffer.store(payload)?)),
        }
    }

    /// The buffer, when buffering.
    pub fn buffer(&self) -> Option<&B> {
        match self {
            TraceSink::Buffered(b) => Some(b),
            TraceSink::Direct(_) => None,
        }
    }

    /// True when payloads are stored rather than sent.
    pub fn is_buffered(&self) -> bool {
        matches!(self, TraceSink::Buffered(_))
    }
}
