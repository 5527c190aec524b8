//! Journal writer.

use super::reader::JournalReader;
use super::record::{check_file_header, file_header, JournalRecord, ValueSpan, FILE_HEADER_SIZE};
use crate::error::{CoreError, CoreResult};
use crate::types::ValueLocation;
use bucketdb_storage::{StorageBackend, StorageResult};

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct Committed {
    /// Offset of the record envelope.
    pub offset: u64,
    /// Payload spans of the record's `Put` values.
    pub spans: Vec<ValueSpan>,
}

impl Committed {
    /// Absolute locations of the committed values, keyed by operation index.
    pub fn locations(&self) -> impl Iterator<Item = (usize, ValueLocation)> + '_ {
        self.spans
            .iter()
            .map(move |span| (span.op, span.locate(self.offset)))
    }
}

/// Appends transaction records to a journal and reads values back.
///
/// A commit is all-or-nothing: if the append, flush or sync fails, the
/// backend is truncated to its size before the commit and
/// [`CoreError::WriteFailed`] is returned.
pub struct JournalWriter {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl JournalWriter {
    /// Opens a journal on `backend`, writing the file header if the backend is
    /// empty.
    ///
    /// A partial header that matches the expected bytes is a crash during
    /// creation and is rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the backend holds something that
    /// is not a journal, or a storage error.
    pub fn open(mut backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> CoreResult<Self> {
        let size = backend.size()?;
        let expected = file_header();

        if size >= FILE_HEADER_SIZE as u64 {
            let header = backend.read_at(0, FILE_HEADER_SIZE)?;
            check_file_header(&header)?;
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let existing = backend.read_at(0, size as usize)?;
            if !expected.starts_with(&existing) {
                return Err(CoreError::invalid_format("not a bucketdb database file"));
            }
            if size > 0 {
                tracing::warn!(size, "rewriting incomplete file header");
                backend.truncate(0)?;
            }
            backend.append(&expected)?;
            backend.flush()?;
            backend.sync()?;
        }

        Ok(Self {
            backend,
            sync_on_commit,
        })
    }

    /// Returns a reader over every record in the journal.
    ///
    /// # Errors
    ///
    /// Fails if the backend size cannot be read.
    pub fn reader(&self) -> CoreResult<JournalReader<'_>> {
        JournalReader::new(self.backend.as_ref(), FILE_HEADER_SIZE as u64)
    }

    /// Cuts the journal at `end`, dropping a torn tail.
    ///
    /// # Errors
    ///
    /// Fails if the truncation or the following sync fails.
    pub fn truncate_to(&mut self, end: u64) -> CoreResult<()> {
        self.backend.truncate(end)?;
        self.backend.sync()?;
        Ok(())
    }

    /// Appends `record` as one atomic transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encode`] if the record is too large and
    /// [`CoreError::WriteFailed`] if it could not be made durable.
    pub fn commit(&mut self, record: &JournalRecord) -> CoreResult<Committed> {
        let (bytes, spans) = record.encode()?;
        let before = self
            .backend
            .size()
            .map_err(|source| CoreError::WriteFailed { source })?;

        match self.write(&bytes) {
            Ok(offset) => Ok(Committed { offset, spans }),
            Err(source) => {
                if let Err(rollback) = self.backend.truncate(before) {
                    tracing::warn!(
                        size = before,
                        error = %rollback,
                        "failed to roll back partial journal write"
                    );
                }
                Err(CoreError::WriteFailed { source })
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let offset = self.backend.append(bytes)?;
        self.backend.flush()?;
        if self.sync_on_commit {
            self.backend.sync()?;
        }
        Ok(offset)
    }

    /// Reads the value stored at `location`.
    ///
    /// # Errors
    ///
    /// Fails if the location lies past the end of the journal or the backend
    /// is unreadable.
    pub fn read_value(&self, location: ValueLocation) -> CoreResult<Vec<u8>> {
        Ok(self
            .backend
            .read_at(location.offset, location.len as usize)?)
    }

    /// Current journal size in bytes, header included.
    ///
    /// # Errors
    ///
    /// Fails if the backend is closed.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Whether commits sync to stable storage.
    #[must_use]
    pub fn sync_on_commit(&self) -> bool {
        self.sync_on_commit
    }

    /// Syncs and releases the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CloseFailed`] if the backend could not be
    /// released.
    pub fn close(&mut self) -> CoreResult<()> {
        self.backend
            .close()
            .map_err(|source| CoreError::CloseFailed { source })
    }
}
