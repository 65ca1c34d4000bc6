//! The buffer contract shared by every backend.

use crate::error::{BufferError, BufferResult};
use perfgate_core::{ConfigError, RecordId, TraceRecord};
use std::sync::Arc;

/// Durable append-only store of captured traces.
///
/// Every backend satisfies the same contract so draining is
/// backend-agnostic:
///
/// - `store` is durable before it returns and yields a fresh id, also under
///   concurrent writers.
/// - `read_chunk` pages in ascending id order starting strictly after
///   `after`; an empty page means the traversal is complete.
/// - `delete_many` ignores unknown or already deleted ids.
/// - `clear` is administrative and racy against concurrent `store` calls.
pub trait TraceBuffer: Send + Sync {
    /// Persist one payload and return its id.
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId>;

    /// Number of records currently stored.
    fn count_unsent(&self) -> BufferResult<usize>;

    /// Up to `max` records with ids greater than `after`, ascending.
    fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>>;

    /// Remove the given records.
    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()>;

    /// Remove every record.
    fn clear(&self) -> BufferResult<()>;

    /// Start of a drain pass. Backends may snapshot traversal state here;
    /// none may hold a lock that blocks `store` until `end_pass`.
    fn begin_pass(&self) -> BufferResult<()> {
        Ok(())
    }

    /// End of a drain pass, called on success and failure alike.
    fn end_pass(&self) -> BufferResult<()> {
        Ok(())
    }
}

impl<B: TraceBuffer + ?Sized> TraceBuffer for Arc<B> {
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
        (**self).store(payload)
    }

    fn count_unsent(&self) -> BufferResult<usize> {
        (**self).count_unsent()
    }

    fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>> {
        (**self).read_chunk(after, max)
    }

    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
        (**self).delete_many(ids)
    }

    fn clear(&self) -> BufferResult<()> {
        (**self).clear()
    }

    fn begin_pass(&self) -> BufferResult<()> {
        (**self).begin_pass()
    }

    fn end_pass(&self) -> BufferResult<()> {
        (**self).end_pass()
    }
}

/// Convenience methods available on every [`TraceBuffer`].
pub trait TraceBufferExt: TraceBuffer {
    /// Lazy sequence of chunks of at most `max` records.
    ///
    /// Each call starts a fresh traversal. Records deleted between chunks do
    /// not disturb the traversal because it resumes from the last id seen.
    fn chunks(&self, max: usize) -> Chunks<'_, Self> {
        Chunks {
            buffer: self,
            max,
            cursor: None,
            done: false,
        }
    }
}

impl<B: TraceBuffer + ?Sized> TraceBufferExt for B {}

/// Iterator returned by [`TraceBufferExt::chunks`].
pub struct Chunks<'a, B: ?Sized> {
    buffer: &'a B,
    max: usize,
    cursor: Option<RecordId>,
    done: bool,
}

impl<'a, B: TraceBuffer + ?Sized> Iterator for Chunks<'a, B> {
    type Item = BufferResult<Vec<TraceRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.max == 0 {
            self.done = true;
            return Some(Err(BufferError::Config(ConfigError::InvalidChunkSize)));
        }
        match self.buffer.read_chunk(self.cursor.as_ref(), self.max) {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => {
                self.cursor = chunk.last().map(|r| r.id.clone());
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
