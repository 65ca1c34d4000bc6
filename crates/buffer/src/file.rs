//! File-backed buffer: one JSON envelope file per record.
//!
//! Layout inside the spool directory:
//!
//! ```text
//! {token}{suffix}             stored record
//! .{token}{suffix}.partial    write in progress (never listed)
//! .{token}{suffix}.corrupt    quarantined, undecodable record (never listed)
//! ```
//!
//! `token` is a zero-padded timestamp in microseconds followed by a random
//! UUID. Timestamps are strictly increasing within a process, so listing
//! order follows store order for a single writer, and concurrent writers
//! never collide. Files whose stem is not token-shaped are not ours and are
//! neither listed nor deleted.
//!
//! A drain pass lists the directory once in `begin_pass` and pages through
//! that snapshot; records stored during the pass are picked up by the next.

use crate::error::{BufferError, BufferResult};
use crate::traits::TraceBuffer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use perfgate_core::config::{validate_path, validate_suffix};
use perfgate_core::{ConfigError, FileSettings, RecordId, TraceRecord};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// On-disk envelope. `data` is base64 so arbitrary bytes survive JSON.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    id: String,
    data: String,
    created_at: DateTime<Utc>,
}

/// Buffer storing one file per record in a directory.
#[derive(Debug)]
pub struct FileBuffer {
    dir: PathBuf,
    suffix: String,
    snapshot: Mutex<Option<Vec<String>>>,
}

impl FileBuffer {
    /// Open (creating if needed) a spool directory.
    ///
    /// Fails immediately on an empty path, a bad suffix, or a path that
    /// exists but is not a directory.
    pub fn open(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> BufferResult<Self> {
        let dir = dir.into();
        let suffix = suffix.into();
        validate_path("sending.file.path", &dir)?;
        validate_suffix(&suffix)?;

        fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(ConfigError::InvalidPath {
                setting: "sending.file.path",
                reason: format!("{} is not a directory", dir.display()),
            }
            .into());
        }
        Ok(Self {
            dir,
            suffix,
            snapshot: Mutex::new(None),
        })
    }

    /// Open from the `[sending.file]` settings.
    pub fn from_settings(settings: &FileSettings) -> BufferResult<Self> {
        let dir = settings
            .path
            .clone()
            .ok_or(ConfigError::MissingSetting("sending.file.path"))?;
        Self::open(dir, settings.suffix.clone())
    }

    /// Spool directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record filename suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn record_path(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{}{}", token, self.suffix))
    }

    fn hidden_path(&self, token: &str, tag: &str) -> PathBuf {
        self.dir.join(format!(".{}{}.{}", token, self.suffix, tag))
    }

    /// Sorted tokens of every stored record.
    fn list_tokens(&self) -> BufferResult<Vec<String>> {
        let mut tokens = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(token) = name.strip_suffix(self.suffix.as_str()) else {
                continue;
            };
            if !is_token(token) || !entry.file_type()?.is_file() {
                continue;
            }
            tokens.push(token.to_string());
        }
        tokens.sort_unstable();
        Ok(tokens)
    }

    /// `Ok(None)` when the file vanished between listing and reading.
    fn read_record(&self, token: &str) -> BufferResult<Option<TraceRecord>> {
        let bytes = match fs::read(self.record_path(token)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| BufferError::Corrupt {
            id: RecordId::Token(token.to_string()),
            reason,
        };
        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        let payload = STANDARD
            .decode(envelope.data.as_bytes())
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(TraceRecord {
            id: RecordId::Token(token.to_string()),
            payload,
            created_at: envelope.created_at,
        }))
    }

    /// Move an undecodable record out of the listing, keeping it for
    /// inspection.
    fn quarantine(&self, token: &str) {
        if let Err(e) = fs::rename(self.record_path(token), self.hidden_path(token, "corrupt")) {
            warn!(token, error = %e, "failed to quarantine corrupt trace file");
        }
    }

    fn remove(&self, token: &str) -> BufferResult<()> {
        match fs::remove_file(self.record_path(token)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Tokens only ever contain these; anything else is not ours.
fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Tail of sorted `tokens` strictly after `after`.
fn tokens_after<'t>(tokens: &'t [String], after: Option<&str>) -> &'t [String] {
    match after {
        Some(a) => &tokens[tokens.partition_point(|t| t.as_str() <= a)..],
        None => tokens,
    }
}

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

fn next_micros(now: i64) -> i64 {
    let mut prev = LAST_MICROS.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_MICROS.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

fn new_token(created_at: &DateTime<Utc>) -> String {
    format!(
        "{:016}-{}",
        next_micros(created_at.timestamp_micros().max(0)),
        Uuid::new_v4().simple()
    )
}

/// Best effort: persist the rename itself.
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "directory fsync skipped");
    }
}

impl TraceBuffer for FileBuffer {
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
        let created_at = Utc::now();
        let token = new_token(&created_at);
        let envelope = Envelope {
            id: token.clone(),
            data: STANDARD.encode(payload),
            created_at,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let partial = self.hidden_path(&token, "partial");
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&partial, self.record_path(&token)));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        sync_dir(&self.dir);

        debug!(token = %token, bytes = payload.len(), "stored trace file");
        Ok(RecordId::Token(token))
    }

    fn count_unsent(&self) -> BufferResult<usize> {
        Ok(self.list_tokens()?.len())
    }

    fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>> {
        let after = after.map(|id| id.to_string());
        let snapshot = self.snapshot.lock();
        let fresh;
        let listed = match snapshot.as_deref() {
            Some(listed) => listed,
            None => {
                fresh = self.list_tokens()?;
                fresh.as_slice()
            }
        };

        let mut chunk = Vec::with_capacity(max.min(1024));
        for token in tokens_after(listed, after.as_deref()) {
            if chunk.len() >= max {
                break;
            }
            match self.read_record(token) {
                Ok(Some(record)) => chunk.push(record),
                Ok(None) => {}
                Err(BufferError::Corrupt { reason, .. }) => {
                    warn!(token = %token, reason = %reason, "quarantining corrupt trace file");
                    self.quarantine(token);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(chunk)
    }

    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
        for id in ids {
            if let RecordId::Token(token) = id {
                if is_token(token) {
                    self.remove(token)?;
                }
            }
        }
        Ok(())
    }

    fn clear(&self) -> BufferResult<()> {
        for token in self.list_tokens()? {
            self.remove(&token)?;
        }
        Ok(())
    }

    fn begin_pass(&self) -> BufferResult<()> {
        let listed = self.list_tokens()?;
        debug!(records = listed.len(), "listed spool for drain pass");
        *self.snapshot.lock() = Some(listed);
        Ok(())
    }

    fn end_pass(&self) -> BufferResult<()> {
        self.snapshot.lock().take();
        Ok(())
    }
}
