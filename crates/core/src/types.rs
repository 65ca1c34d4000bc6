//! Record and subject types shared by every perfgate crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned identifier of a stored trace record.
///
/// Unique within one buffer and never reused for the buffer's lifetime.
/// The table backend hands out auto-increment sequence numbers, the file
/// backend hands out random tokens (the file stem).
///
/// Ordering is only meaningful between ids of the same backend; buffers use
/// it as a traversal cursor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordId {
    /// Auto-increment row id
    Seq(i64),
    /// Opaque token (e.g. a file stem)
    Token(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Seq(n) => write!(f, "{}", n),
            RecordId::Token(t) => f.write_str(t),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Seq(n)
    }
}

impl From<String> for RecordId {
    fn from(t: String) -> Self {
        RecordId::Token(t)
    }
}

/// One captured, serialized profiling result.
///
/// The payload is opaque: it is stored and transported whole and never
/// interpreted. Records are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Backend-assigned id
    pub id: RecordId,
    /// Serialized trace produced by the instrumentation engine
    pub payload: Vec<u8>,
    /// Capture time; diagnostics and ordering only
    pub created_at: DateTime<Utc>,
}

/// Kind of profiled unit of work. Include/exclude lists are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    /// An HTTP request
    Http,
    /// A console command
    Console,
    /// A queued job
    Queue,
    /// A scheduled task
    Schedule,
    /// An unhandled exception report
    Exception,
}

impl SubjectKind {
    /// All subject kinds.
    pub const ALL: [SubjectKind; 5] = [
        SubjectKind::Http,
        SubjectKind::Console,
        SubjectKind::Queue,
        SubjectKind::Schedule,
        SubjectKind::Exception,
    ];

    /// Lowercase name, as used in config keys and span names.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Http => "http",
            SubjectKind::Console => "console",
            SubjectKind::Queue => "queue",
            SubjectKind::Schedule => "schedule",
            SubjectKind::Exception => "exception",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
