//! Helpers shared by unit tests.

use bucketdb_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory backend whose appends write half their data and fail while
/// the switch is on.
pub(crate) struct FlakyBackend {
    inner: InMemoryBackend,
    fail: Arc<AtomicBool>,
}

impl FlakyBackend {
    /// Returns the backend and the switch controlling it.
    pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let backend = Self {
            inner: InMemoryBackend::new(),
            fail: Arc::clone(&fail),
        };
        (backend, fail)
    }
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.fail.load(Ordering::SeqCst) {
            self.inner.append(&data[..data.len() / 2])?;
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }

    fn close(&mut self) -> StorageResult<()> {
        self.inner.close()
    }
}
