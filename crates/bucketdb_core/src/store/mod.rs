//! The partition store.
//!
//! A [`PartitionStore`] owns one database file holding named partitions of
//! byte-keyed entries. Every mutation is its own transaction: one journal
//! record, made durable before the in-memory index changes.
//!
//! ## Invariants
//!
//! - Readers hold the index read lock for the whole read and see only
//!   committed state.
//! - Writers are serialized by the index write lock.
//! - A failed commit leaves both the journal and the index as they were.
//! - After [`PartitionStore::close`] every operation fails with
//!   [`CoreError::ConnectionClosed`].

mod index;

pub use index::PartitionIndex;

use crate::dir::{compaction_path, sync_parent};
use crate::error::{CoreError, CoreResult};
use crate::journal::{file_header, JournalOp, JournalRecord, JournalWriter};
use crate::stats::{CompactionStats, StoreCounters, StoreStats};
use crate::types::DEFAULT_PARTITION;
use bucketdb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageResult};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for opening a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Sync the file to stable storage on every commit. When `false`, commits
    /// are flushed to the OS only.
    pub sync_on_commit: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
        }
    }
}

impl StoreOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether commits sync to stable storage.
    #[must_use]
    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }
}

struct StoreState {
    index: PartitionIndex,
    journal: JournalWriter,
    records: u64,
}

/// A single-file store of named, byte-keyed partitions.
///
/// # Example
///
/// ```rust
/// use bucketdb_core::{PartitionStore, StoreOptions};
///
/// let store = PartitionStore::open_in_memory(&[b"users".to_vec()], StoreOptions::new()).unwrap();
/// store.put(b"users", b"alice", b"30").unwrap();
/// assert_eq!(store.get(b"users", b"alice").unwrap(), Some(b"30".to_vec()));
/// ```
pub struct PartitionStore {
    path: Option<PathBuf>,
    options: StoreOptions,
    state: RwLock<Option<StoreState>>,
    counters: StoreCounters,
}

impl PartitionStore {
    /// Opens or creates the database file at `path`.
    ///
    /// The file is locked exclusively, its header validated and its journal
    /// replayed. Then, in one transaction, every partition in `partitions`
    /// that does not exist yet is created, along with the default partition.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DatabaseLocked`] if another handle holds the file
    /// - [`CoreError::OpenFailed`] if the file cannot be opened or created
    /// - [`CoreError::InvalidFormat`] if the file is not a database
    /// - [`CoreError::JournalCorruption`] or [`CoreError::ChecksumMismatch`]
    ///   if the journal is damaged
    pub fn open_file(path: &Path, partitions: &[Vec<u8>], options: StoreOptions) -> CoreResult<Self> {
        let backend =
            FileBackend::open(path).map_err(|e| CoreError::open_failed(path.to_path_buf(), e))?;
        Self::open_with_backend(Box::new(backend), Some(path.to_path_buf()), partitions, options)
    }

    /// Opens a store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Fails only if the initial partitions cannot be committed.
    pub fn open_in_memory(partitions: &[Vec<u8>], options: StoreOptions) -> CoreResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), None, partitions, options)
    }

    /// Opens a store over an arbitrary backend.
    ///
    /// `path` is the file the backend writes to, if any; compaction needs it
    /// to write the replacement file next to the original.
    ///
    /// # Errors
    ///
    /// Same as [`PartitionStore::open_file`].
    pub fn open_with_backend(
        backend: Box<dyn StorageBackend>,
        path: Option<PathBuf>,
        partitions: &[Vec<u8>],
        options: StoreOptions,
    ) -> CoreResult<Self> {
        let state = load(backend, partitions, options).map_err(|e| {
            let shown = path.clone().unwrap_or_else(|| PathBuf::from(":memory:"));
            match e {
                CoreError::Storage(source) | CoreError::WriteFailed { source } => {
                    CoreError::open_failed(shown, source)
                }
                other => other,
            }
        })?;

        Ok(Self {
            path,
            options,
            state: RwLock::new(Some(state)),
            counters: StoreCounters::new(),
        })
    }

    /// Path of the database file, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Options the store was opened with.
    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Live operation counters.
    #[must_use]
    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    /// Returns `true` once the store has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the partition has no such key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing,
    /// or [`CoreError::ConnectionClosed`] after close.
    pub fn get(&self, partition: &[u8], key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;

        let Some(location) = state.index.lookup(partition, key)? else {
            return Ok(None);
        };
        let value = state.journal.read_value(location)?;
        self.counters.record_read();
        Ok(Some(value))
    }

    /// Inserts or overwrites the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing,
    /// [`CoreError::WriteFailed`] if the commit failed (nothing is applied),
    /// or [`CoreError::ConnectionClosed`] after close.
    pub fn put(&self, partition: &[u8], key: &[u8], value: &[u8]) -> CoreResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(CoreError::ConnectionClosed)?;

        if !state.index.has_partition(partition) {
            return Err(CoreError::partition_not_found(partition));
        }

        let record = JournalRecord::single(JournalOp::Put {
            partition: partition.to_vec(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self.commit(state, &record)?;
        self.counters.record_write();
        Ok(())
    }

    /// Removes the entry under `key`.
    ///
    /// Removing an absent key succeeds and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing,
    /// [`CoreError::WriteFailed`] if the commit failed, or
    /// [`CoreError::ConnectionClosed`] after close.
    pub fn delete(&self, partition: &[u8], key: &[u8]) -> CoreResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(CoreError::ConnectionClosed)?;

        if state.index.lookup(partition, key)?.is_none() {
            return Ok(());
        }

        let record = JournalRecord::single(JournalOp::Delete {
            partition: partition.to_vec(),
            key: key.to_vec(),
        });
        self.commit(state, &record)?;
        self.counters.record_delete();
        Ok(())
    }

    fn commit(&self, state: &mut StoreState, record: &JournalRecord) -> CoreResult<()> {
        match state.journal.commit(record) {
            Ok(committed) => {
                state
                    .index
                    .apply(record, committed.offset, &committed.spans)?;
                state.records += 1;
                Ok(())
            }
            Err(e) => {
                self.counters.record_failed_commit();
                Err(e)
            }
        }
    }

    /// Returns `true` if the partition exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConnectionClosed`] after close.
    pub fn has_partition(&self, partition: &[u8]) -> CoreResult<bool> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;
        Ok(state.index.has_partition(partition))
    }

    /// Partition names in byte order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConnectionClosed`] after close.
    pub fn partition_names(&self) -> CoreResult<Vec<Vec<u8>>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;
        Ok(state.index.names().map(<[u8]>::to_vec).collect())
    }

    /// Number of entries in a partition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing,
    /// or [`CoreError::ConnectionClosed`] after close.
    pub fn len(&self, partition: &[u8]) -> CoreResult<usize> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;
        state.index.partition_len(partition)
    }

    /// Returns `true` if the partition has no entries.
    ///
    /// # Errors
    ///
    /// Same as [`PartitionStore::len`].
    pub fn is_empty(&self, partition: &[u8]) -> CoreResult<bool> {
        Ok(self.len(partition)? == 0)
    }

    /// Every entry of a partition in key order.
    ///
    /// The result is one consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing,
    /// or [`CoreError::ConnectionClosed`] after close.
    pub fn scan(&self, partition: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;

        let entries = state
            .index
            .iter_partition(partition)?
            .map(|(key, location)| -> CoreResult<_> {
                Ok((key.to_vec(), state.journal.read_value(location)?))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        self.counters.record_scan();
        Ok(entries)
    }

    /// Snapshot of the store's size and counters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConnectionClosed`] after close.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(CoreError::ConnectionClosed)?;

        Ok(StoreStats {
            partitions: state.index.partition_count(),
            entries: state.index.entry_count(),
            journal_bytes: state.journal.size()?,
            records: state.records,
            reads: self.counters.reads(),
            writes: self.counters.writes(),
            deletes: self.counters.deletes(),
            scans: self.counters.scans(),
            failed_commits: self.counters.failed_commits(),
            compactions: self.counters.compactions(),
        })
    }

    /// Rewrites the journal as a single snapshot record.
    ///
    /// For a file store the snapshot is written and synced to
    /// `<file>.compact`, then renamed over the original. The compacted file
    /// stays open and locked across the rename and becomes the new journal,
    /// so no other handle can take the file while compaction runs. If
    /// anything fails before the rename the store keeps using the original
    /// file. If the compacted file cannot be replayed after the rename the
    /// store is left closed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WriteFailed`] if the snapshot cannot be written,
    /// a storage or I/O error if the rename or directory sync fails, or
    /// [`CoreError::ConnectionClosed`] after close.
    pub fn compact(&self) -> CoreResult<CompactionStats> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(CoreError::ConnectionClosed)?;

        let bytes_before = state.journal.size()?;
        let records_before = state.records;
        let entries = state.index.entry_count();
        let snapshot = snapshot_record(state)?;

        match &self.path {
            Some(path) => {
                let scratch = compaction_path(path);
                let mut backend = match write_snapshot(&scratch, &snapshot) {
                    Ok(backend) => backend,
                    Err(e) => {
                        discard_scratch(&scratch);
                        return Err(e);
                    }
                };

                if let Err(e) = backend.rename(path) {
                    drop(backend);
                    discard_scratch(&scratch);
                    return Err(e.into());
                }
                let synced = sync_parent(path);

                let fresh = match load(Box::new(backend), &[], self.options) {
                    Ok(fresh) => fresh,
                    Err(e) => {
                        if let Err(close) = state.journal.close() {
                            tracing::warn!(error = %close, "closing replaced journal failed");
                        }
                        *guard = None;
                        return Err(e);
                    }
                };
                let mut old = std::mem::replace(state, fresh);
                if let Err(e) = old.journal.close() {
                    tracing::warn!(error = %e, "closing replaced journal failed");
                }
                synced?;
            }
            None => {
                let mut journal =
                    JournalWriter::open(Box::new(InMemoryBackend::new()), self.options.sync_on_commit)?;
                let committed = journal.commit(&snapshot)?;
                let mut index = PartitionIndex::new();
                index.apply(&snapshot, committed.offset, &committed.spans)?;

                let mut old = std::mem::replace(&mut state.journal, journal);
                if let Err(e) = old.close() {
                    tracing::warn!(error = %e, "closing replaced journal failed");
                }
                state.index = index;
                state.records = 1;
            }
        }

        let bytes_after = guard
            .as_ref()
            .ok_or(CoreError::ConnectionClosed)?
            .journal
            .size()?;
        self.counters.record_compaction();

        let stats = CompactionStats {
            bytes_before,
            bytes_after,
            records_before,
            entries,
        };
        tracing::info!(
            bytes_before,
            bytes_after,
            reclaimed = stats.bytes_reclaimed(),
            entries,
            "journal compacted"
        );
        Ok(stats)
    }

    /// Syncs and closes the file, releasing its lock.
    ///
    /// Waits for in-flight operations to finish. The store counts as closed
    /// even when this fails.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CloseFailed`] if the file could not be synced or
    /// released, or [`CoreError::ConnectionClosed`] if already closed.
    pub fn close(&self) -> CoreResult<()> {
        let mut guard = self.state.write();
        let mut state = guard.take().ok_or(CoreError::ConnectionClosed)?;
        state.journal.close()
    }
}

/// Opens a journal, replays it and creates the missing partitions.
fn load(
    backend: Box<dyn StorageBackend>,
    partitions: &[Vec<u8>],
    options: StoreOptions,
) -> CoreResult<StoreState> {
    let mut journal = JournalWriter::open(backend, options.sync_on_commit)?;
    let mut index = PartitionIndex::new();
    let mut records = 0u64;

    let (valid_end, torn) = {
        let mut reader = journal.reader()?;
        for replayed in reader.by_ref() {
            let replayed = replayed?;
            index.apply(&replayed.record, replayed.offset, &replayed.spans)?;
            records += 1;
        }
        (reader.valid_end(), reader.is_torn())
    };

    if torn {
        let size = journal.size()?;
        tracing::warn!(
            valid_end,
            discarded = size - valid_end,
            "truncating torn journal tail"
        );
        journal.truncate_to(valid_end)?;
    }

    tracing::debug!(
        records,
        partitions = index.partition_count(),
        entries = index.entry_count(),
        "journal replayed"
    );

    let mut missing: Vec<Vec<u8>> = Vec::new();
    let default = DEFAULT_PARTITION.as_bytes();
    for name in partitions.iter().map(Vec::as_slice).chain(std::iter::once(default)) {
        if !index.has_partition(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_vec());
        }
    }

    if !missing.is_empty() {
        let record = JournalRecord::new(
            missing
                .iter()
                .map(|name| JournalOp::CreatePartition { name: name.clone() })
                .collect(),
        );
        let committed = journal.commit(&record)?;
        index.apply(&record, committed.offset, &committed.spans)?;
        records += 1;

        for name in &missing {
            tracing::debug!(partition = %String::from_utf8_lossy(name), "created partition");
        }
    }

    Ok(StoreState {
        index,
        journal,
        records,
    })
}

/// Builds one record recreating every live partition and entry.
fn snapshot_record(state: &StoreState) -> CoreResult<JournalRecord> {
    let mut ops = Vec::with_capacity(state.index.partition_count() + state.index.entry_count());
    for name in state.index.names() {
        ops.push(JournalOp::CreatePartition {
            name: name.to_vec(),
        });
        for (key, location) in state.index.iter_partition(name)? {
            ops.push(JournalOp::Put {
                partition: name.to_vec(),
                key: key.to_vec(),
                value: state.journal.read_value(location)?,
            });
        }
    }
    Ok(JournalRecord::new(ops))
}

/// Writes a synced journal holding only `snapshot` and returns it still locked.
fn write_snapshot(scratch: &Path, snapshot: &JournalRecord) -> CoreResult<FileBackend> {
    let (bytes, _) = snapshot.encode()?;
    let mut backend =
        FileBackend::create(scratch).map_err(|source| CoreError::WriteFailed { source })?;

    let written = (|| -> StorageResult<()> {
        backend.append(&file_header())?;
        backend.append(&bytes)?;
        backend.flush()?;
        backend.sync()
    })();
    written.map_err(|source| CoreError::WriteFailed { source })?;
    Ok(backend)
}

fn discard_scratch(scratch: &Path) {
    if let Err(e) = fs::remove_file(scratch) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %scratch.display(), error = %e, "failed to remove compaction file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{FILE_HEADER_SIZE, RECORD_HEADER_SIZE};
    use crate::test_support::FlakyBackend;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn memory(partitions: &[&str]) -> PartitionStore {
        PartitionStore::open_in_memory(&names(partitions), StoreOptions::new()).unwrap()
    }

    #[test]
    fn open_creates_requested_and_default_partitions() {
        let store = memory(&["users", "orders"]);
        assert_eq!(
            store.partition_names().unwrap(),
            names(&["default", "orders", "users"])
        );
        // One record for the whole creation.
        assert_eq!(store.stats().unwrap().records, 1);
    }

    #[test]
    fn put_get_delete() {
        let store = memory(&["users"]);
        assert_eq!(store.get(b"users", b"alice").unwrap(), None);

        store.put(b"users", b"alice", b"30").unwrap();
        assert_eq!(store.get(b"users", b"alice").unwrap(), Some(b"30".to_vec()));

        store.put(b"users", b"alice", b"31").unwrap();
        assert_eq!(store.get(b"users", b"alice").unwrap(), Some(b"31".to_vec()));
        assert_eq!(store.len(b"users").unwrap(), 1);

        store.delete(b"users", b"alice").unwrap();
        assert_eq!(store.get(b"users", b"alice").unwrap(), None);
        assert!(store.is_empty(b"users").unwrap());
    }

    #[test]
    fn deleting_absent_key_writes_nothing() {
        let store = memory(&["users"]);
        let before = store.stats().unwrap();
        store.delete(b"users", b"nobody").unwrap();
        store.delete(b"users", b"nobody").unwrap();
        let after = store.stats().unwrap();
        assert_eq!(before.journal_bytes, after.journal_bytes);
        assert_eq!(after.deletes, 0);
    }

    #[test]
    fn missing_partition_errors() {
        let store = memory(&[]);
        assert!(matches!(
            store.get(b"ghosts", b"k"),
            Err(CoreError::PartitionNotFound { .. })
        ));
        assert!(matches!(
            store.put(b"ghosts", b"k", b"v"),
            Err(CoreError::PartitionNotFound { .. })
        ));
        assert!(matches!(
            store.delete(b"ghosts", b"k"),
            Err(CoreError::PartitionNotFound { .. })
        ));
        assert!(!store.has_partition(b"ghosts").unwrap());
    }

    #[test]
    fn partitions_are_independent() {
        let store = memory(&["a", "b"]);
        store.put(b"a", b"k", b"in a").unwrap();
        assert_eq!(store.get(b"b", b"k").unwrap(), None);
        store.delete(b"b", b"k").unwrap();
        assert_eq!(store.get(b"a", b"k").unwrap(), Some(b"in a".to_vec()));
    }

    #[test]
    fn scan_is_key_ordered() {
        let store = memory(&["p"]);
        store.put(b"p", b"b", b"2").unwrap();
        store.put(b"p", b"a", b"1").unwrap();
        store.put(b"p", b"c", b"3").unwrap();
        store.delete(b"p", b"b").unwrap();

        let entries = store.scan(b"p").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"c".to_vec(), b"3".to_vec())
            ]
        );
    }

    #[test]
    fn failed_commit_leaves_state_untouched() {
        let (backend, fail) = FlakyBackend::new();
        let store = PartitionStore::open_with_backend(
            Box::new(backend),
            None,
            &names(&["users"]),
            StoreOptions::new(),
        )
        .unwrap();
        store.put(b"users", b"alice", b"30").unwrap();
        let before = store.stats().unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = store.put(b"users", b"alice", b"99").unwrap_err();
        assert!(matches!(err, CoreError::WriteFailed { .. }));
        let err = store.delete(b"users", b"alice").unwrap_err();
        assert!(matches!(err, CoreError::WriteFailed { .. }));

        let after = store.stats().unwrap();
        assert_eq!(before.journal_bytes, after.journal_bytes);
        assert_eq!(after.failed_commits, 2);
        assert_eq!(store.get(b"users", b"alice").unwrap(), Some(b"30".to_vec()));

        fail.store(false, Ordering::SeqCst);
        store.put(b"users", b"bob", b"41").unwrap();
        assert_eq!(store.len(b"users").unwrap(), 2);
    }

    #[test]
    fn operations_after_close_fail() {
        let store = memory(&["users"]);
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.get(b"users", b"k"), Err(CoreError::ConnectionClosed)));
        assert!(matches!(store.put(b"users", b"k", b"v"), Err(CoreError::ConnectionClosed)));
        assert!(matches!(store.delete(b"users", b"k"), Err(CoreError::ConnectionClosed)));
        assert!(matches!(store.compact(), Err(CoreError::ConnectionClosed)));
        assert!(matches!(store.close(), Err(CoreError::ConnectionClosed)));
    }

    #[test]
    fn file_store_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");

        {
            let store = PartitionStore::open_file(&path, &names(&["users"]), StoreOptions::new()).unwrap();
            store.put(b"users", b"alice", b"30").unwrap();
            store.put(b"users", b"bob", b"41").unwrap();
            store.delete(b"users", b"bob").unwrap();
            store.close().unwrap();
        }

        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        assert_eq!(store.get(b"users", b"alice").unwrap(), Some(b"30".to_vec()));
        assert_eq!(store.get(b"users", b"bob").unwrap(), None);
        // Nothing new to create on reopen.
        assert_eq!(store.stats().unwrap().records, 4);
    }

    #[test]
    fn second_open_is_locked_out() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");

        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        let err = PartitionStore::open_file(&path, &[], StoreOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::DatabaseLocked { .. }));

        store.close().unwrap();
        PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
    }

    #[test]
    fn foreign_file_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, b"these are not the bytes you are looking for").unwrap();

        let err = PartitionStore::open_file(&path, &[], StoreOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn torn_tail_is_truncated_on_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");

        {
            let store = PartitionStore::open_file(&path, &names(&["p"]), StoreOptions::new()).unwrap();
            store.put(b"p", b"kept", b"yes").unwrap();
            store.put(b"p", b"torn", b"no").unwrap();
            store.close().unwrap();
        }
        let full = fs::read(&path).unwrap();
        fs::write(&path, &full[..full.len() - 3]).unwrap();

        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        assert_eq!(store.get(b"p", b"kept").unwrap(), Some(b"yes".to_vec()));
        assert_eq!(store.get(b"p", b"torn").unwrap(), None);

        // The torn bytes are gone, so new commits replay cleanly.
        store.put(b"p", b"after", b"ok").unwrap();
        store.close().unwrap();
        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        assert_eq!(store.get(b"p", b"after").unwrap(), Some(b"ok".to_vec()));
    }

    #[test]
    fn corrupted_record_refuses_to_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");

        {
            let store = PartitionStore::open_file(&path, &names(&["p"]), StoreOptions::new()).unwrap();
            store.put(b"p", b"k", b"value").unwrap();
            store.close().unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        bytes[FILE_HEADER_SIZE + RECORD_HEADER_SIZE + 2] ^= 0x55;
        fs::write(&path, &bytes).unwrap();

        let err = PartitionStore::open_file(&path, &[], StoreOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::ChecksumMismatch { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Open);
    }

    #[test]
    fn compact_file_store_preserves_content() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");
        let store = PartitionStore::open_file(&path, &names(&["p", "q"]), StoreOptions::new()).unwrap();

        for round in 0..20u8 {
            store.put(b"p", b"counter", &[round]).unwrap();
        }
        store.put(b"q", b"gone", b"x").unwrap();
        store.delete(b"q", b"gone").unwrap();

        let stats = store.compact().unwrap();
        assert!(stats.bytes_reclaimed() > 0);
        assert_eq!(stats.entries, 1);
        assert!(!compaction_path(&path).exists());

        assert_eq!(store.get(b"p", b"counter").unwrap(), Some(vec![19]));
        assert_eq!(store.get(b"q", b"gone").unwrap(), None);
        assert!(store.has_partition(b"q").unwrap());
        assert_eq!(store.stats().unwrap().records, 1);

        store.put(b"p", b"later", b"1").unwrap();
        store.close().unwrap();

        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        assert_eq!(store.get(b"p", b"counter").unwrap(), Some(vec![19]));
        assert_eq!(store.get(b"p", b"later").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.partition_names().unwrap(), names(&["default", "p", "q"]));
    }

    #[test]
    fn compaction_never_releases_the_file_lock() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");
        let store = PartitionStore::open_file(&path, &names(&["p"]), StoreOptions::new()).unwrap();
        for round in 0..5u8 {
            store.put(b"p", b"k", &[round]).unwrap();
        }

        store.compact().unwrap();
        assert!(matches!(
            FileBackend::open(&path),
            Err(bucketdb_storage::StorageError::Locked { .. })
        ));
        let err = PartitionStore::open_file(&path, &[], StoreOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::DatabaseLocked { .. }));

        // Writes after compaction land in the file at the original path.
        store.put(b"p", b"after", b"1").unwrap();
        assert_eq!(
            store.stats().unwrap().journal_bytes,
            fs::metadata(&path).unwrap().len()
        );
        store.close().unwrap();

        let store = PartitionStore::open_file(&path, &[], StoreOptions::new()).unwrap();
        assert_eq!(store.get(b"p", b"k").unwrap(), Some(vec![4]));
        assert_eq!(store.get(b"p", b"after").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn failed_compaction_keeps_the_original_journal() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.db");
        let store = PartitionStore::open_file(&path, &names(&["p"]), StoreOptions::new()).unwrap();
        store.put(b"p", b"k", b"v").unwrap();
        let before = store.stats().unwrap().journal_bytes;

        // A directory in the way makes the snapshot file impossible to create.
        fs::create_dir(compaction_path(&path)).unwrap();
        assert!(matches!(store.compact(), Err(CoreError::WriteFailed { .. })));

        assert!(!store.is_closed());
        assert_eq!(store.stats().unwrap().journal_bytes, before);
        assert!(matches!(
            FileBackend::open(&path),
            Err(bucketdb_storage::StorageError::Locked { .. })
        ));
        store.put(b"p", b"k2", b"v2").unwrap();
        assert_eq!(store.get(b"p", b"k").unwrap(), Some(b"v".to_vec()));
        store.close().unwrap();
    }

    #[test]
    fn stats_report_every_counter() {
        let store = memory(&["p"]);
        store.put(b"p", b"a", b"1").unwrap();
        store.put(b"p", b"b", b"2").unwrap();
        store.get(b"p", b"a").unwrap();
        store.get(b"p", b"missing").unwrap();
        store.delete(b"p", b"b").unwrap();
        store.delete(b"p", b"b").unwrap();
        store.scan(b"p").unwrap();
        store.compact().unwrap();

        let stats = store.stats().unwrap();
        let counters = store.counters();
        assert_eq!((stats.reads, counters.reads()), (1, 1));
        assert_eq!((stats.writes, counters.writes()), (2, 2));
        assert_eq!((stats.deletes, counters.deletes()), (1, 1));
        assert_eq!((stats.scans, counters.scans()), (1, 1));
        assert_eq!((stats.compactions, counters.compactions()), (1, 1));
        assert_eq!(stats.failed_commits, counters.failed_commits());
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn compact_memory_store() {
        let store = memory(&["p"]);
        store.put(b"p", b"a", b"1").unwrap();
        store.put(b"p", b"a", b"2").unwrap();
        store.put(b"p", b"b", b"3").unwrap();

        let stats = store.compact().unwrap();
        assert_eq!(stats.records_before, 4);
        assert_eq!(store.scan(b"p").unwrap().len(), 2);
        assert_eq!(store.get(b"p", b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.stats().unwrap().compactions, 1);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let store = Arc::new(memory(&["p"]));
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50u8 {
                        store.put(b"p", &[t, i], &[i]).unwrap();
                        assert_eq!(store.get(b"p", &[t, i]).unwrap(), Some(vec![i]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(b"p").unwrap(), 200);
    }
}
