//! Chunked drain of a trace buffer into a sender.
//!
//! A pass walks the buffer in ascending id order, one chunk at a time. Each
//! record is submitted in order; a chunk is deleted only once every record
//! in it was accepted. When a submission fails, the records of that chunk
//! that were already accepted are deleted and the pass stops, so the failed
//! record and everything after it stay for the next pass.
//!
//! This gives at-least-once delivery: a crash between a confirmed submit and
//! the delete resends that record on the next pass, never more than once per
//! such crash.

use crate::error::{DrainError, SendError};
use crate::sender::Sender;
use perfgate_buffer::{TraceBuffer, TraceBufferExt};
use perfgate_core::{ConfigError, RecordId, TraceRecord};
use tracing::{debug, info, warn};

/// Records fetched and submitted per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// One fully synced chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Records submitted and deleted
    pub count: usize,
    /// First id in the chunk
    pub first_id: RecordId,
    /// Last id in the chunk
    pub last_id: RecordId,
}

/// Why a pass stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainFailure {
    /// Records of the failing chunk that were accepted and deleted
    pub salvaged: usize,
    /// First and last id of the salvaged records, if any
    pub salvaged_range: Option<(RecordId, RecordId)>,
    /// The record whose submission failed
    pub failed_id: RecordId,
    /// Sender error for `failed_id`
    pub error: SendError,
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records in the buffer when the pass started
    pub found: usize,
    /// Fully synced chunks, in order
    pub chunks: Vec<ChunkSummary>,
    /// Set when a submission failure ended the pass
    pub failure: Option<DrainFailure>,
}

impl DrainReport {
    /// Records submitted and removed during the pass.
    pub fn synced(&self) -> usize {
        let full: usize = self.chunks.iter().map(|c| c.count).sum();
        full + self.failure.as_ref().map_or(0, |f| f.salvaged)
    }

    /// True when the pass ran to the end of the buffer.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Moves buffered traces to a sender in bounded chunks.
#[derive(Debug, Clone, Copy)]
pub struct DrainEngine {
    chunk_size: usize,
}

impl Default for DrainEngine {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DrainEngine {
    /// Engine with the given chunk size, which must be positive.
    pub fn new(chunk_size: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    /// Records per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Run one pass. See [`DrainEngine::drain_with_progress`].
    pub fn drain<B, S>(&self, buffer: &B, sender: &S) -> Result<DrainReport, DrainError>
    where
        B: TraceBuffer + ?Sized,
        S: Sender + ?Sized,
    {
        self.drain_with_progress(buffer, sender, |_| {})
    }

    /// Run one pass, calling `on_chunk` after each fully synced chunk.
    ///
    /// Submission failures end the pass with `Ok` and a populated
    /// [`DrainReport::failure`]; `Err` means the buffer itself failed.
    pub fn drain_with_progress<B, S, F>(
        &self,
        buffer: &B,
        sender: &S,
        on_chunk: F,
    ) -> Result<DrainReport, DrainError>
    where
        B: TraceBuffer + ?Sized,
        S: Sender + ?Sized,
        F: FnMut(&ChunkSummary),
    {
        buffer.begin_pass()?;
        let outcome = self.run_pass(buffer, sender, on_chunk);
        let ended = buffer.end_pass();
        let report = outcome?;
        ended?;
        Ok(report)
    }

    fn run_pass<B, S, F>(
        &self,
        buffer: &B,
        sender: &S,
        mut on_chunk: F,
    ) -> Result<DrainReport, DrainError>
    where
        B: TraceBuffer + ?Sized,
        S: Sender + ?Sized,
        F: FnMut(&ChunkSummary),
    {
        let found = buffer.count_unsent()?;
        let mut report = DrainReport {
            found,
            ..DrainReport::default()
        };
        if found == 0 {
            debug!("buffer empty, nothing to drain");
            return Ok(report);
        }

        for chunk in buffer.chunks(self.chunk_size) {
            let chunk = chunk?;
            match submit_chunk(sender, &chunk) {
                Ok(ids) => {
                    buffer.delete_many(&ids)?;
                    let summary = ChunkSummary {
                        count: ids.len(),
                        first_id: chunk[0].id.clone(),
                        last_id: chunk[chunk.len() - 1].id.clone(),
                    };
                    info!(
                        count = summary.count,
                        first = %summary.first_id,
                        last = %summary.last_id,
                        "synced chunk"
                    );
                    on_chunk(&summary);
                    report.chunks.push(summary);
                }
                Err((accepted, failed_id, error)) => {
                    warn!(
                        record = %failed_id,
                        salvaged = accepted.len(),
                        error = %error,
                        "submission failed, stopping drain pass"
                    );
                    if !accepted.is_empty() {
                        buffer.delete_many(&accepted)?;
                    }
                    let salvaged_range = match (accepted.first(), accepted.last()) {
                        (Some(first), Some(last)) => Some((first.clone(), last.clone())),
                        _ => None,
                    };
                    report.failure = Some(DrainFailure {
                        salvaged: accepted.len(),
                        salvaged_range,
                        failed_id,
                        error,
                    });
                    break;
                }
            }
        }
        Ok(report)
    }
}

type ChunkFailure = (Vec<RecordId>, RecordId, SendError);

/// Submit records in order. On failure returns the ids accepted so far.
fn submit_chunk<S: Sender + ?Sized>(
    sender: &S,
    chunk: &[TraceRecord],
) -> Result<Vec<RecordId>, ChunkFailure> {
    let mut accepted = Vec::with_capacity(chunk.len());
    for record in chunk {
        match sender.submit(&record.payload) {
            Ok(()) => accepted.push(record.id.clone()),
            Err(e) => return Err((accepted, record.id.clone(), e)),
        }
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::sender_fn;
    use parking_lot::Mutex;
    use perfgate_buffer::{BufferError, BufferResult, TableBuffer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn filled(n: usize) -> TableBuffer {
        let buffer = TableBuffer::open_in_memory("traces").unwrap();
        for i in 0..n {
            buffer.store(format!("trace-{i}").as_bytes()).unwrap();
        }
        buffer
    }

    #[test]
    fn test_chunk_size_must_be_positive() {
        assert!(matches!(DrainEngine::new(0), Err(ConfigError::InvalidChunkSize)));
        assert_eq!(DrainEngine::new(3).unwrap().chunk_size(), 3);
        assert_eq!(DrainEngine::default().chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = filled(0);
        let sender = sender_fn(|_: &[u8]| panic!("nothing to send"));
        let report = DrainEngine::default().drain(&buffer, &sender).unwrap();
        assert_eq!(report, DrainReport::default());
        assert!(report.is_complete());
    }

    #[test]
    fn test_drains_everything_in_order() {
        let buffer = filled(10);
        let seen = Mutex::new(Vec::new());
        let sender = sender_fn(|p: &[u8]| {
            seen.lock().push(String::from_utf8(p.to_vec()).unwrap());
            Ok(())
        });
        let mut progress = Vec::new();
        let report = DrainEngine::new(3)
            .unwrap()
            .drain_with_progress(&buffer, &sender, |c| progress.push(c.count))
            .unwrap();

        assert_eq!(report.found, 10);
        assert_eq!(report.synced(), 10);
        assert_eq!(progress, vec![3, 3, 3, 1]);
        assert_eq!(report.chunks[0].first_id, RecordId::Seq(1));
        assert_eq!(report.chunks[3].last_id, RecordId::Seq(10));
        assert_eq!(buffer.count_unsent().unwrap(), 0);

        let expected: Vec<String> = (0..10).map(|i| format!("trace-{i}")).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn test_failure_salvages_accepted_prefix() {
        let buffer = filled(10);
        let calls = AtomicUsize::new(0);
        let sender = sender_fn(|_: &[u8]| {
            if calls.fetch_add(1, Ordering::SeqCst) == 5 {
                Err(SendError::Rejected { status: 500 })
            } else {
                Ok(())
            }
        });
        let report = DrainEngine::new(10).unwrap().drain(&buffer, &sender).unwrap();

        assert!(report.chunks.is_empty());
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.salvaged, 5);
        assert_eq!(
            failure.salvaged_range,
            Some((RecordId::Seq(1), RecordId::Seq(5)))
        );
        assert_eq!(failure.failed_id, RecordId::Seq(6));
        assert_eq!(failure.error, SendError::Rejected { status: 500 });
        assert_eq!(report.synced(), 5);
        assert_eq!(buffer.count_unsent().unwrap(), 5);

        let ok = sender_fn(|_: &[u8]| Ok(()));
        let rerun = DrainEngine::new(10).unwrap().drain(&buffer, &ok).unwrap();
        assert_eq!(rerun.synced(), 5);
        assert_eq!(rerun.chunks[0].first_id, RecordId::Seq(6));
        assert_eq!(buffer.count_unsent().unwrap(), 0);
    }

    #[test]
    fn test_failure_stops_before_later_chunks() {
        let buffer = filled(7);
        let calls = AtomicUsize::new(0);
        let sender = sender_fn(|_: &[u8]| {
            if calls.fetch_add(1, Ordering::SeqCst) == 3 {
                Err(SendError::Transport("reset".into()))
            } else {
                Ok(())
            }
        });
        let report = DrainEngine::new(3).unwrap().drain(&buffer, &sender).unwrap();
        assert_eq!(report.chunks.len(), 1);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.salvaged, 0);
        assert_eq!(failure.salvaged_range, None);
        assert_eq!(failure.failed_id, RecordId::Seq(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(buffer.count_unsent().unwrap(), 4);
    }

    /// Buffer whose pass hooks and deletes are observable.
    struct Recording {
        inner: TableBuffer,
        events: Mutex<Vec<&'static str>>,
        fail_delete: bool,
    }

    impl TraceBuffer for Recording {
        fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
            self.inner.store(payload)
        }
        fn count_unsent(&self) -> BufferResult<usize> {
            self.inner.count_unsent()
        }
        fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>> {
            self.inner.read_chunk(after, max)
        }
        fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
            self.events.lock().push("delete");
            if self.fail_delete {
                return Err(BufferError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")));
            }
            self.inner.delete_many(ids)
        }
        fn clear(&self) -> BufferResult<()> {
            self.inner.clear()
        }
        fn begin_pass(&self) -> BufferResult<()> {
            self.events.lock().push("begin");
            Ok(())
        }
        fn end_pass(&self) -> BufferResult<()> {
            self.events.lock().push("end");
            Ok(())
        }
    }

    #[test]
    fn test_pass_hooks_wrap_work() {
        let buffer = Recording {
            inner: filled(2),
            events: Mutex::new(Vec::new()),
            fail_delete: false,
        };
        DrainEngine::new(1)
            .unwrap()
            .drain(&buffer, &sender_fn(|_: &[u8]| Ok(())))
            .unwrap();
        assert_eq!(*buffer.events.lock(), vec!["begin", "delete", "delete", "end"]);
    }

    #[test]
    fn test_storage_failure_still_ends_pass() {
        let buffer = Recording {
            inner: filled(2),
            events: Mutex::new(Vec::new()),
            fail_delete: true,
        };
        let result = DrainEngine::default().drain(&buffer, &sender_fn(|_: &[u8]| Ok(())));
        assert!(matches!(result, Err(DrainError::Storage(BufferError::Io(_)))));
        assert_eq!(*buffer.events.lock(), vec!["begin", "delete", "end"]);
        assert_eq!(buffer.count_unsent().unwrap(), 2);
    }
}
