//! Connection lifecycle.

use super::bucket::Bucket;
use super::traits::Handler;
use crate::config::ConnectConfig;
use crate::dir::DatabaseDir;
use crate::error::CoreResult;
use crate::stats::{CompactionStats, StoreStats};
use crate::store::{PartitionStore, StoreOptions};
use crate::types::PartitionName;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Shared {
    store: PartitionStore,
    path: PathBuf,
    ephemeral: bool,
    /// Taken by the first successful close.
    dir: Mutex<Option<DatabaseDir>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if self.store.is_closed() {
            return;
        }
        // Last handle dropped without close.
        if let Err(e) = self.store.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "close on drop failed");
            return;
        }
        if let Some(dir) = self.dir.get_mut().take() {
            if let Err(e) = dir.remove() {
                tracing::warn!(error = %e, "temporary directory not removed");
            }
        }
    }
}

/// An open database.
///
/// Handles made with [`Handler::copy`] (or `clone`) share one open file. The
/// file is closed once, by the first [`Handler::close`]; every handle fails
/// with [`crate::CoreError::ConnectionClosed`] afterwards. Dropping the last
/// handle without closing closes the file too.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    /// Opens (or creates) the database described by `config`.
    ///
    /// Every partition named in the config is created if absent, along with
    /// the default partition. Without a directory the file lives in a new
    /// temporary directory that is removed on close.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::InvalidConfig`] if the config is malformed
    /// - [`crate::CoreError::DatabaseLocked`] if the file is already open
    /// - [`crate::CoreError::OpenFailed`], [`crate::CoreError::InvalidFormat`]
    ///   or a corruption error if the file cannot be used
    pub fn connect(config: ConnectConfig) -> CoreResult<Self> {
        config.validate()?;

        let dir = DatabaseDir::resolve(config.effective_directory(), &config.filename)?;
        let path = dir.file_path(&config.filename);
        let options = StoreOptions::new().sync_on_commit(config.sync_on_commit);

        let store = match PartitionStore::open_file(&path, &config.partitions_to_create(), options) {
            Ok(store) => store,
            Err(e) => {
                if let Err(cleanup) = dir.remove() {
                    tracing::warn!(error = %cleanup, "temporary directory not removed");
                }
                return Err(e);
            }
        };

        let ephemeral = dir.is_ephemeral();
        tracing::info!(
            path = %path.display(),
            ephemeral,
            sync_on_commit = options.sync_on_commit,
            "connected"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                store,
                path,
                ephemeral,
                dir: Mutex::new(Some(dir)),
            }),
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Returns `true` if the database lives in a temporary directory that is
    /// removed on close.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.shared.ephemeral
    }

    /// Returns `true` once any handle has closed the database.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.store.is_closed()
    }

    /// The underlying partition store, for byte-level access.
    #[must_use]
    pub fn store(&self) -> &PartitionStore {
        &self.shared.store
    }

    /// Partition names in byte order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ConnectionClosed`] after close.
    pub fn partition_names(&self) -> CoreResult<Vec<String>> {
        Ok(self
            .shared
            .store
            .partition_names()?
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect())
    }

    /// Rewrites the database file without overwritten or removed entries.
    ///
    /// # Errors
    ///
    /// See [`PartitionStore::compact`].
    pub fn compact(&self) -> CoreResult<CompactionStats> {
        self.shared.store.compact()
    }

    /// Snapshot of the database size and operation counters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ConnectionClosed`] after close.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        self.shared.store.stats()
    }
}

impl Handler for Connection {
    type Querier = Bucket;

    fn copy(&self) -> Self {
        self.clone()
    }

    fn close(self) -> CoreResult<()> {
        self.shared.store.close()?;
        tracing::info!(path = %self.shared.path.display(), "connection closed");

        let dir = self.shared.dir.lock().take();
        if let Some(dir) = dir {
            dir.remove()?;
        }
        Ok(())
    }

    fn exec_on(&self, partition: &str) -> Bucket {
        Bucket::new(self.clone(), PartitionName::select(partition))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.shared.path)
            .field("ephemeral", &self.shared.ephemeral)
            .field("closed", &self.is_closed())
            .finish()
    }
}
