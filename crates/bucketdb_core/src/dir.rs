//! Database directory management.
//!
//! A connection keeps its database file inside one directory:
//!
//! ```text
//! <directory>/
//! ├─ <filename>           # the database file (journal)
//! └─ <filename>.compact   # present only while a compaction runs
//! ```
//!
//! When no directory is configured a fresh temporary directory is created and
//! marked ephemeral; it is removed once the connection has been closed.

use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the scratch file written during compaction.
const COMPACT_SUFFIX: &str = ".compact";

/// The directory holding a database file.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    ephemeral: bool,
}

impl DatabaseDir {
    /// Resolves the directory for `filename`.
    ///
    /// With `Some(directory)` the directory is created if missing and kept
    /// after close. With `None` a new temporary directory named after
    /// `filename` is created and marked ephemeral.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created, or
    /// [`CoreError::InvalidConfig`] if the path exists but is not a directory.
    pub fn resolve(directory: Option<&Path>, filename: &str) -> CoreResult<Self> {
        match directory {
            Some(path) => {
                if path.exists() && !path.is_dir() {
                    return Err(CoreError::invalid_config(format!(
                        "not a directory: {}",
                        path.display()
                    )));
                }
                fs::create_dir_all(path)?;
                Ok(Self {
                    path: path.to_path_buf(),
                    ephemeral: false,
                })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("{filename}-"))
                    .keep(true)
                    .tempdir()?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    ephemeral: true,
                })
            }
        }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the directory is removed on close.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Path of `filename` inside the directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// Removes the directory and its contents if it is ephemeral.
    ///
    /// A directory supplied by the caller is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DirectoryCleanup`] if removal fails.
    pub fn remove(self) -> CoreResult<()> {
        if !self.ephemeral {
            return Ok(());
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoreError::DirectoryCleanup {
                path: self.path,
                source,
            }),
        }
    }
}

/// Path of the compaction scratch file for `file`.
pub(crate) fn compaction_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(COMPACT_SUFFIX);
    PathBuf::from(name)
}

/// Syncs the directory containing `file` so a rename is durable.
#[cfg(unix)]
pub(crate) fn sync_parent(file: &Path) -> CoreResult<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::File::open(parent)?.sync_all()?;
    }
    Ok(())
}

// NTFS journals metadata; directories cannot be opened for fsync.
#[cfg(not(unix))]
pub(crate) fn sync_parent(_file: &Path) -> CoreResult<()> {
    Ok(())
}
