//! Journal replay.

use super::record::{
    checksum, JournalRecord, ValueSpan, CRC_SIZE, RECORD_HEADER_SIZE, RECORD_MAGIC, RECORD_VERSION,
};
use crate::error::{CoreError, CoreResult};
use bucketdb_storage::StorageBackend;

/// A record read back from the journal.
#[derive(Debug, Clone)]
pub struct ReplayedRecord {
    /// Offset of the record envelope.
    pub offset: u64,
    /// The decoded transaction.
    pub record: JournalRecord,
    /// Payload spans of the record's `Put` values.
    pub spans: Vec<ValueSpan>,
}

/// Iterates the records of a journal from a start offset to the end.
///
/// Iteration stops at the end of the data or at a torn tail: a trailing record
/// whose header or body is cut short. [`JournalReader::valid_end`] then reports
/// where the intact journal ends. Structural damage inside the data (bad magic,
/// checksum mismatch, newer record version, malformed payload) is yielded as an
/// error and ends iteration.
pub struct JournalReader<'a> {
    backend: &'a dyn StorageBackend,
    offset: u64,
    size: u64,
    torn: bool,
    done: bool,
}

impl<'a> JournalReader<'a> {
    /// Creates a reader over `backend` starting at `start`.
    ///
    /// # Errors
    ///
    /// Fails if the backend size cannot be read.
    pub fn new(backend: &'a dyn StorageBackend, start: u64) -> CoreResult<Self> {
        let size = backend.size()?;
        Ok(Self {
            backend,
            offset: start,
            size,
            torn: false,
            done: false,
        })
    }

    /// Offset just past the last intact record read so far.
    #[must_use]
    pub fn valid_end(&self) -> u64 {
        self.offset
    }

    /// Returns `true` if iteration stopped at an incomplete trailing record.
    #[must_use]
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    fn read_next(&mut self) -> CoreResult<Option<ReplayedRecord>> {
        let remaining = self.size - self.offset;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < (RECORD_HEADER_SIZE + CRC_SIZE) as u64 {
            self.torn = true;
            return Ok(None);
        }

        let offset = self.offset;
        let header = self.backend.read_at(offset, RECORD_HEADER_SIZE)?;

        if header[..4] != RECORD_MAGIC {
            return Err(CoreError::journal_corruption(offset, "bad record magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > RECORD_VERSION {
            return Err(CoreError::journal_corruption(
                offset,
                format!("unsupported record version {version}"),
            ));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;

        let total = (RECORD_HEADER_SIZE + len + CRC_SIZE) as u64;
        if total > remaining {
            self.torn = true;
            return Ok(None);
        }

        let body = self.backend.read_at(offset + RECORD_HEADER_SIZE as u64, len + CRC_SIZE)?;
        let (payload, crc_bytes) = body.split_at(len);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut checked = header;
        checked.extend_from_slice(payload);
        let actual = checksum(&checked);
        if actual != expected {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let (record, spans) = JournalRecord::decode_payload(payload, offset)?;
        self.offset = offset + total;

        Ok(Some(ReplayedRecord {
            offset,
            record,
            spans,
        }))
    }
}

impl Iterator for JournalReader<'_> {
    type Item = CoreResult<ReplayedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
