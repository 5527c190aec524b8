//! Single-file storage backend with an exclusive advisory lock.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A storage backend over one file on disk.
///
/// The file is locked exclusively for as long as the backend is open, so only
/// one handle (in this or any other process) can use it at a time. The lock is
/// released by [`StorageBackend::close`] or when the backend is dropped.
///
/// # Example
///
/// ```no_run
/// use bucketdb_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("buckets.db")).unwrap();
/// backend.append(b"payload").unwrap();
/// backend.sync().unwrap();
/// backend.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<Option<File>>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens the file at `path`, creating it if missing, and locks it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock, or an
    /// I/O error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::lock(path, file)
    }

    /// Creates an empty file at `path`, replacing any existing content, and
    /// locks it.
    ///
    /// # Errors
    ///
    /// Same as [`FileBackend::open`].
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::lock(path, file)
    }

    fn lock(path: &Path, file: File) -> StorageResult<Self> {
        // Fully qualified so std's inherent `File` locking methods never shadow fs2.
        if let Err(err) = FileExt::try_lock_exclusive(&file) {
            if err.kind() == fs2::lock_contended_error().kind() {
                return Err(StorageError::Locked {
                    path: path.to_path_buf(),
                });
            }
            return Err(err.into());
        }

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(Some(file)),
            size: RwLock::new(size),
        })
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the file to `to`, replacing whatever is there, while keeping the
    /// handle open and locked.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] after close, or an I/O error if the
    /// rename fails. On failure the file stays at its old path.
    pub fn rename(&mut self, to: &Path) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        std::fs::rename(&self.path, to)?;
        self.path = to.to_path_buf();
        Ok(())
    }

    /// Returns `true` once the backend has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.file.read().is_none()
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        // Seeking mutates the shared cursor, so reads take the write lock too.
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;

        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut guard = self.file.write();
        guard.as_mut().ok_or(StorageError::Closed)?.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let guard = self.file.read();
        guard.as_ref().ok_or(StorageError::Closed)?.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let guard = self.file.write();
        let file = guard.as_ref().ok_or(StorageError::Closed)?;
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(mut file) = self.file.write().take() else {
            return Err(StorageError::Closed);
        };

        let synced = file.flush().and_then(|()| file.sync_all());
        let unlocked = FileExt::unlock(&file);
        drop(file);

        synced?;
        unlocked?;
        Ok(())
    }
}
