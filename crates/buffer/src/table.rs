//! Table-backed buffer: one SQLite row per record.
//!
//! Schema (created on open when missing):
//!
//! ```sql
//! CREATE TABLE {table} (
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     data       TEXT NOT NULL,   -- base64 payload
//!     created_at TEXT NOT NULL,   -- RFC 3339
//!     updated_at TEXT NOT NULL
//! )
//! ```
//!
//! AUTOINCREMENT keeps ids from being reused after deletes or `clear`.
//! No write lock is held across a drain pass: each `delete_many` is its own
//! atomic unit, so writers in other processes only ever wait for one delete.

use crate::error::{BufferError, BufferResult};
use crate::traits::TraceBuffer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use perfgate_core::config::{validate_path, validate_table_name};
use perfgate_core::{ConfigError, DatabaseSettings, RecordId, TraceRecord};
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Buffer storing one row per record in a SQLite table.
pub struct TableBuffer {
    conn: Mutex<Connection>,
    table: String,
}

impl std::fmt::Debug for TableBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBuffer")
            .field("table", &self.table)
            .finish()
    }
}

impl TableBuffer {
    /// Open (creating if needed) the database file and table.
    pub fn open(path: impl AsRef<Path>, table: &str, busy_timeout: Duration) -> BufferResult<Self> {
        validate_path("sending.database.path", path.as_ref())?;
        validate_table_name(table)?;
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn, table, busy_timeout)
    }

    /// Open an in-memory database. Contents vanish on drop.
    pub fn open_in_memory(table: &str) -> BufferResult<Self> {
        validate_table_name(table)?;
        let conn = Connection::open_in_memory()?;
        Self::init(conn, table, Duration::ZERO)
    }

    /// Open from the `[sending.database]` settings.
    pub fn from_settings(settings: &DatabaseSettings) -> BufferResult<Self> {
        let path = settings
            .path
            .as_deref()
            .ok_or(ConfigError::MissingSetting("sending.database.path"))?;
        Self::open(
            path,
            &settings.table,
            Duration::from_millis(settings.busy_timeout_ms),
        )
    }

    fn init(conn: Connection, table: &str, busy_timeout: Duration) -> BufferResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            table
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS` form older writers used.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

impl TraceBuffer for TableBuffer {
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
        let conn = self.conn.lock();
        let now = timestamp(Utc::now());
        conn.execute(
            &format!(
                "INSERT INTO {} (data, created_at, updated_at) VALUES (?1, ?2, ?2)",
                self.table
            ),
            params![STANDARD.encode(payload), now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, bytes = payload.len(), table = %self.table, "stored trace row");
        Ok(RecordId::Seq(id))
    }

    fn count_unsent(&self) -> BufferResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>> {
        let after = match after {
            Some(RecordId::Seq(n)) => *n,
            _ => 0,
        };
        let limit = i64::try_from(max).unwrap_or(i64::MAX);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT id, data, created_at FROM {} WHERE id > ?1 ORDER BY id LIMIT ?2",
            self.table
        ))?;
        let rows = stmt.query_map(params![after, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut chunk = Vec::new();
        for row in rows {
            let (id, data, created_at) = row?;
            let payload = STANDARD.decode(data.as_bytes()).map_err(|e| BufferError::Corrupt {
                id: RecordId::Seq(id),
                reason: format!("data is not base64: {}", e),
            })?;
            let created_at = parse_timestamp(&created_at).ok_or_else(|| BufferError::Corrupt {
                id: RecordId::Seq(id),
                reason: format!("invalid created_at {:?}", created_at),
            })?;
            chunk.push(TraceRecord {
                id: RecordId::Seq(id),
                payload,
                created_at,
            });
        }
        Ok(chunk)
    }

    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
        let seqs: Vec<i64> = ids
            .iter()
            .filter_map(|id| match id {
                RecordId::Seq(n) => Some(*n),
                RecordId::Token(_) => None,
            })
            .collect();
        if seqs.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock();
        // Savepoints nest if the caller already opened a transaction.
        conn.execute_batch("SAVEPOINT perfgate_delete")?;
        let deleted = (|| -> rusqlite::Result<()> {
            let mut stmt =
                conn.prepare_cached(&format!("DELETE FROM {} WHERE id = ?1", self.table))?;
            for id in &seqs {
                stmt.execute([id])?;
            }
            Ok(())
        })();
        match deleted {
            Ok(()) => {
                conn.execute_batch("RELEASE perfgate_delete")?;
                Ok(())
            }
            Err(e) => {
                conn.execute_batch("ROLLBACK TO perfgate_delete; RELEASE perfgate_delete")?;
                Err(e.into())
            }
        }
    }

    fn clear(&self) -> BufferResult<()> {
        let conn = self.conn.lock();
        conn.execute(&format!("DELETE FROM {}", self.table), [])?;
        Ok(())
    }
}
