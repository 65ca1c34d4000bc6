//! Failure midway through a pass, and recovery on the next pass.

use super::*;
use perfgate::{BufferError, BufferResult, DrainEngine, DrainError, RecordId, TraceRecord};

#[test]
fn failure_on_sixth_submission_keeps_the_rest() {
    for fx in backends() {
        fill(&fx.buffer, 10);

        let flaky = RecordingSender::failing_on(6);
        let report = DrainEngine::new(10).unwrap().drain(&fx.buffer, &flaky).unwrap();
        assert!(!report.is_complete(), "{}", fx.name);
        assert_eq!(report.synced(), 5, "{}", fx.name);
        assert_eq!(fx.buffer.count_unsent().unwrap(), 5, "{}", fx.name);

        let healthy = RecordingSender::new();
        let rerun = DrainEngine::new(10).unwrap().drain(&fx.buffer, &healthy).unwrap();
        assert!(rerun.is_complete(), "{}", fx.name);
        assert_eq!(rerun.synced(), 5, "{}", fx.name);
        assert_eq!(fx.buffer.count_unsent().unwrap(), 0, "{}", fx.name);

        for i in 0..10 {
            let payload = format!("trace-{i}").into_bytes();
            let total = flaky.attempts_for(&payload) + healthy.attempts_for(&payload);
            assert!((1..=2).contains(&total), "{} trace-{i} sent {total} times", fx.name);
        }
        // The record that failed is the only one attempted twice.
        assert_eq!(flaky.attempts_for(b"trace-5") + healthy.attempts_for(b"trace-5"), 2);
    }
}

#[test]
fn failure_stops_before_later_chunks() {
    for fx in backends() {
        fill(&fx.buffer, 9);
        let flaky = RecordingSender::failing_on(4);
        let report = DrainEngine::new(3).unwrap().drain(&fx.buffer, &flaky).unwrap();

        assert_eq!(report.chunks.len(), 1, "{}", fx.name);
        assert_eq!(flaky.calls(), 4, "{}", fx.name);
        assert_eq!(fx.buffer.count_unsent().unwrap(), 6, "{}", fx.name);
    }
}

/// Buffer that loses its first delete, like a process dying right after a
/// confirmed submission.
struct CrashBeforeDelete<'a> {
    inner: &'a BufferBackend,
    crashed: Mutex<bool>,
}

impl TraceBuffer for CrashBeforeDelete<'_> {
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
        self.inner.store(payload)
    }
    fn count_unsent(&self) -> BufferResult<usize> {
        self.inner.count_unsent()
    }
    fn read_chunk(
        &self,
        after: Option<&RecordId>,
        max: usize,
    ) -> BufferResult<Vec<TraceRecord>> {
        self.inner.read_chunk(after, max)
    }
    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
        let mut crashed = self.crashed.lock();
        if !*crashed {
            *crashed = true;
            return Err(BufferError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "killed",
            )));
        }
        self.inner.delete_many(ids)
    }
    fn clear(&self) -> BufferResult<()> {
        self.inner.clear()
    }
    fn begin_pass(&self) -> BufferResult<()> {
        self.inner.begin_pass()
    }
    fn end_pass(&self) -> BufferResult<()> {
        self.inner.end_pass()
    }
}

#[test]
fn crash_between_submit_and_delete_resends_once() {
    for fx in backends() {
        fill(&fx.buffer, 3);
        let crashing = CrashBeforeDelete {
            inner: &fx.buffer,
            crashed: Mutex::new(false),
        };

        let first = RecordingSender::new();
        let result = DrainEngine::new(3).unwrap().drain(&crashing, &first);
        assert!(
            matches!(result, Err(DrainError::Storage(BufferError::Io(_)))),
            "{}",
            fx.name
        );
        assert_eq!(fx.buffer.count_unsent().unwrap(), 3, "{}", fx.name);

        let second = RecordingSender::new();
        DrainEngine::new(3).unwrap().drain(&crashing, &second).unwrap();
        assert_eq!(fx.buffer.count_unsent().unwrap(), 0, "{}", fx.name);

        for i in 0..3 {
            let payload = format!("trace-{i}").into_bytes();
            assert_eq!(first.attempts_for(&payload) + second.attempts_for(&payload), 2);
        }
    }
}
