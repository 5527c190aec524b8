//! Connection configuration.

use crate::error::{CoreError, CoreResult};
use crate::types::DEFAULT_PARTITION;
use std::path::{Path, PathBuf};

/// Configuration for [`crate::Connection::connect`].
///
/// ```rust
/// use bucketdb_core::ConnectConfig;
///
/// let config = ConnectConfig::new("app.db")
///     .directory("/var/lib/app")
///     .partition("users")
///     .partition("sessions");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Name of the database file inside `directory`.
    pub filename: String,

    /// Directory holding the file. `None` (or an empty path) makes the
    /// connection create a fresh temporary directory and remove it on close.
    pub directory: Option<PathBuf>,

    /// Partitions to create at connect time if absent. The default partition
    /// is always created in addition.
    pub partitions: Vec<String>,

    /// Whether every commit is synced to stable storage before returning.
    pub sync_on_commit: bool,
}

impl ConnectConfig {
    /// Creates a configuration for `filename` in a temporary directory.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            directory: None,
            partitions: Vec::new(),
            sync_on_commit: true,
        }
    }

    /// Places the database file in `directory`.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Adds one partition to create at connect time.
    #[must_use]
    pub fn partition(mut self, name: impl Into<String>) -> Self {
        self.partitions.push(name.into());
        self
    }

    /// Adds several partitions, keeping their order.
    #[must_use]
    pub fn partitions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets whether commits are synced before returning.
    #[must_use]
    pub fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Returns the directory, treating an empty path as absent.
    #[must_use]
    pub fn effective_directory(&self) -> Option<&Path> {
        self.directory
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Returns the partitions to create, default last and without duplicates.
    #[must_use]
    pub fn partitions_to_create(&self) -> Vec<Vec<u8>> {
        let mut names: Vec<Vec<u8>> = Vec::with_capacity(self.partitions.len() + 1);
        let requested = self.partitions.iter().map(String::as_str);
        for name in requested.chain(std::iter::once(DEFAULT_PARTITION)) {
            if !names.iter().any(|n| n == name.as_bytes()) {
                names.push(name.as_bytes().to_vec());
            }
        }
        names
    }

    /// Checks the configuration before any file system work happens.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the filename is empty, is `.` or
    /// `..`, or contains a path separator, or if a partition name is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.filename.is_empty() {
            return Err(CoreError::invalid_config("filename is required"));
        }
        if self.filename == "." || self.filename == ".." {
            return Err(CoreError::invalid_config(format!(
                "filename {:?} is not a file name",
                self.filename
            )));
        }
        if self.filename.contains(|c| c == '/' || c == '\\') {
            return Err(CoreError::invalid_config(format!(
                "filename {:?} must not contain path separators",
                self.filename
            )));
        }
        if self.partitions.iter().any(String::is_empty) {
            return Err(CoreError::invalid_config("partition names must not be empty"));
        }
        Ok(())
    }
}
