//! Closed set of buffering backends, selected by the sending mode.

use crate::error::BufferResult;
use crate::file::FileBuffer;
use crate::table::TableBuffer;
use crate::traits::TraceBuffer;
use perfgate_core::{Config, RecordId, SendingMode, TraceRecord};

/// A configured buffer backend.
///
/// Synchronous sending has no buffer at all, so it has no variant here:
/// [`BufferBackend::from_config`] returns `None` for it.
#[derive(Debug)]
pub enum BufferBackend {
    /// One file per record
    File(FileBuffer),
    /// One SQLite row per record
    Table(TableBuffer),
}

impl BufferBackend {
    /// Build the backend for `config.sending.mode`.
    ///
    /// Returns `Ok(None)` in sync mode. Bad backend settings fail here, not
    /// on first use.
    pub fn from_config(config: &Config) -> BufferResult<Option<Self>> {
        let backend = match config.sending.mode {
            SendingMode::Sync => return Ok(None),
            SendingMode::File => BufferBackend::File(FileBuffer::from_settings(&config.sending.file)?),
            SendingMode::Database => {
                BufferBackend::Table(TableBuffer::from_settings(&config.sending.database)?)
            }
        };
        Ok(Some(backend))
    }

    /// The sending mode this backend serves.
    pub fn mode(&self) -> SendingMode {
        match self {
            BufferBackend::File(_) => SendingMode::File,
            BufferBackend::Table(_) => SendingMode::Database,
        }
    }

    fn inner(&self) -> &dyn TraceBuffer {
        match self {
            BufferBackend::File(b) => b,
            BufferBackend::Table(b) => b,
        }
    }
}

impl TraceBuffer for BufferBackend {
    fn store(&self, payload: &[u8]) -> BufferResult<RecordId> {
        self.inner().store(payload)
    }

    fn count_unsent(&self) -> BufferResult<usize> {
        self.inner().count_unsent()
    }

    fn read_chunk(&self, after: Option<&RecordId>, max: usize) -> BufferResult<Vec<TraceRecord>> {
        self.inner().read_chunk(after, max)
    }

    fn delete_many(&self, ids: &[RecordId]) -> BufferResult<()> {
        self.inner().delete_many(ids)
    }

    fn clear(&self) -> BufferResult<()> {
        self.inner().clear()
    }

    fn begin_pass(&self) -> BufferResult<()> {
        self.inner().begin_pass()
    }

    fn end_pass(&self) -> BufferResult<()> {
        self.inner().end_pass()
    }
}
