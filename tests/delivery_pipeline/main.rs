//! Delivery pipeline test suite
//!
//! Drives both buffer backends through the drain engine the way a
//! production drain process would: store, drain in chunks, fail midway,
//! rerun, clear.
//!
//! ```bash
//! cargo test --test delivery_pipeline
//! cargo test --test delivery_pipeline crash_recovery::
//! ```

use parking_lot::Mutex;
use perfgate::{
    BufferBackend, Config, FileBuffer, SendError, Sender, SendingMode, TableBuffer, TraceBuffer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub mod capture_flow;
pub mod chunking;
pub mod clear;
pub mod crash_recovery;
pub mod round_trip;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// A backend together with the directory that keeps it alive.
pub struct Fixture {
    pub name: &'static str,
    pub buffer: BufferBackend,
    _dir: TempDir,
}

/// One fresh fixture per backend.
pub fn backends() -> Vec<Fixture> {
    let file_dir = tempfile::tempdir().unwrap();
    let file = FileBuffer::open(file_dir.path().join("spool"), ".trace").unwrap();

    let table_dir = tempfile::tempdir().unwrap();
    let table = TableBuffer::open(
        table_dir.path().join("buffer.db"),
        "perfgate_traces",
        Duration::from_secs(5),
    )
    .unwrap();

    vec![
        Fixture {
            name: "file",
            buffer: BufferBackend::File(file),
            _dir: file_dir,
        },
        Fixture {
            name: "table",
            buffer: BufferBackend::Table(table),
            _dir: table_dir,
        },
    ]
}

/// Configuration selecting `mode` with its location inside `dir`.
pub fn buffered_config(mode: SendingMode, dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.enabled = true;
    config.sending.mode = mode;
    config.sending.file.path = Some(dir.join("spool"));
    config.sending.database.path = Some(dir.join("buffer.db"));
    config
}

/// Store `n` payloads `trace-0` .. `trace-{n-1}`.
pub fn fill<B: TraceBuffer + ?Sized>(buffer: &B, n: usize) {
    for i in 0..n {
        buffer.store(format!("trace-{i}").as_bytes()).unwrap();
    }
}

/// Sender that records every attempt and can fail on a given call.
#[derive(Default)]
pub struct RecordingSender {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    accepted: Mutex<Vec<Vec<u8>>>,
    attempts: Mutex<HashMap<Vec<u8>, usize>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `n`th call (1-based); every other call succeeds.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn accepted(&self) -> Vec<Vec<u8>> {
        self.accepted.lock().clone()
    }

    pub fn attempts_for(&self, payload: &[u8]) -> usize {
        self.attempts.lock().get(payload).copied().unwrap_or(0)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sender for RecordingSender {
    fn submit(&self, payload: &[u8]) -> Result<(), SendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.attempts.lock().entry(payload.to_vec()).or_insert(0) += 1;
        if self.fail_on_call == Some(call) {
            return Err(SendError::Transport("connection reset".into()));
        }
        self.accepted.lock().push(payload.to_vec());
        Ok(())
    }
}
