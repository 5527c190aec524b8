//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// # Invariants
///
/// - `append` returns the offset at which the data starts
/// - `read_at` returns exactly the bytes previously appended at that range
/// - after `flush`, appended data has been handed to the OS
/// - after `sync`, appended data and file metadata are on stable storage
/// - after `close`, every other method fails with [`crate::StorageError::Closed`]
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range extends past the current size or an I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors. Part of `data` may have been written; callers that
    /// need atomicity truncate back to the previous size.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the OS.
    ///
    /// # Errors
    ///
    /// Fails if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes, which is the next append offset.
    ///
    /// # Errors
    ///
    /// Fails if the backend is closed.
    fn size(&self) -> StorageResult<u64>;

    /// Makes all data and metadata durable.
    ///
    /// # Errors
    ///
    /// Fails if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the storage down to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` exceeds the current size or on I/O errors.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Syncs and releases the underlying resources.
    ///
    /// # Errors
    ///
    /// Fails if the final sync or the release fails. The backend counts as
    /// closed either way.
    fn close(&mut self) -> StorageResult<()>;
}
