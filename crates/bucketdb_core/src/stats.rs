//! Store statistics.
//!
//! [`StoreCounters`] are bumped by the partition store as operations run and
//! can be read while operations are in progress. [`StoreStats`] is the
//! point-in-time view returned by `PartitionStore::stats`; it carries every
//! counter kept here.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic operation counters.
#[derive(Debug, Default)]
pub struct StoreCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    failed_commits: AtomicU64,
    compactions: AtomicU64,
}

impl StoreCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_commit(&self) {
        self.failed_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of successful `get` calls.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of committed `put` calls.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of committed deletes. Deletes of absent keys are not counted.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Number of full-partition scans.
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Number of commits that failed and were rolled back.
    pub fn failed_commits(&self) -> u64 {
        self.failed_commits.load(Ordering::Relaxed)
    }

    /// Number of completed compactions.
    pub fn compactions(&self) -> u64 {
        self.compactions.load(Ordering::Relaxed)
    }
}

/// A point-in-time snapshot of a store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Number of partitions.
    pub partitions: usize,
    /// Number of live entries across all partitions.
    pub entries: usize,
    /// Journal size in bytes, file header included.
    pub journal_bytes: u64,
    /// Number of records in the journal.
    pub records: u64,
    /// Successful reads since open.
    pub reads: u64,
    /// Committed puts since open.
    pub writes: u64,
    /// Committed deletes since open.
    pub deletes: u64,
    /// Full-partition scans since open.
    pub scans: u64,
    /// Commits rolled back since open.
    pub failed_commits: u64,
    /// Compactions since open.
    pub compactions: u64,
}

/// Outcome of a compaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    /// Journal size before compaction.
    pub bytes_before: u64,
    /// Journal size after compaction.
    pub bytes_after: u64,
    /// Records replaced.
    pub records_before: u64,
    /// Live entries carried into the snapshot.
    pub entries: usize,
}

impl CompactionStats {
    /// Bytes reclaimed by the compaction.
    #[must_use]
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}
