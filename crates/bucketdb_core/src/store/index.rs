//! In-memory ordered index of partitions and entries.

use crate::error::{CoreError, CoreResult};
use crate::journal::{JournalOp, JournalRecord, ValueSpan};
use crate::types::ValueLocation;
use std::collections::BTreeMap;

type Entries = BTreeMap<Vec<u8>, ValueLocation>;

/// Maps every partition to its key-ordered entries and their journal
/// locations.
///
/// The index is derived state: it is rebuilt by replaying the journal on
/// open and updated by applying each committed record.
#[derive(Debug, Default)]
pub struct PartitionIndex {
    partitions: BTreeMap<Vec<u8>, Entries>,
}

impl PartitionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the partition exists.
    #[must_use]
    pub fn has_partition(&self, name: &[u8]) -> bool {
        self.partitions.contains_key(name)
    }

    /// Partition names in byte order.
    pub fn names(&self) -> impl Iterator<Item = &[u8]> {
        self.partitions.keys().map(Vec::as_slice)
    }

    /// Number of partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Number of live entries across all partitions.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    fn entries(&self, partition: &[u8]) -> CoreResult<&Entries> {
        self.partitions
            .get(partition)
            .ok_or_else(|| CoreError::partition_not_found(partition))
    }

    /// Location of the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing.
    pub fn lookup(&self, partition: &[u8], key: &[u8]) -> CoreResult<Option<ValueLocation>> {
        Ok(self.entries(partition)?.get(key).copied())
    }

    /// Number of entries in one partition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing.
    pub fn partition_len(&self, partition: &[u8]) -> CoreResult<usize> {
        Ok(self.entries(partition)?.len())
    }

    /// Entries of one partition in key order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartitionNotFound`] if the partition is missing.
    pub fn iter_partition(
        &self,
        partition: &[u8],
    ) -> CoreResult<impl Iterator<Item = (&[u8], ValueLocation)>> {
        Ok(self
            .entries(partition)?
            .iter()
            .map(|(key, location)| (key.as_slice(), *location)))
    }

    /// Applies a committed record located at `record_offset`.
    ///
    /// `spans` are the record's value spans in operation order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JournalCorruption`] if the record writes to a
    /// partition that does not exist or its spans do not match its `Put`
    /// operations. Live commits are validated before they are written, so
    /// this only fires while replaying a damaged journal.
    pub fn apply(
        &mut self,
        record: &JournalRecord,
        record_offset: u64,
        spans: &[ValueSpan],
    ) -> CoreResult<()> {
        let mut spans = spans.iter();

        for (index, op) in record.ops.iter().enumerate() {
            match op {
                JournalOp::CreatePartition { name } => {
                    self.partitions.entry(name.clone()).or_default();
                }
                JournalOp::Put { partition, key, .. } => {
                    let span = spans
                        .next()
                        .filter(|span| span.op == index)
                        .ok_or_else(|| {
                            CoreError::journal_corruption(record_offset, "value span mismatch")
                        })?;
                    self.entries_mut(partition, record_offset)?
                        .insert(key.clone(), span.locate(record_offset));
                }
                JournalOp::Delete { partition, key } => {
                    self.entries_mut(partition, record_offset)?.remove(key);
                }
            }
        }

        Ok(())
    }

    fn entries_mut(&mut self, partition: &[u8], record_offset: u64) -> CoreResult<&mut Entries> {
        self.partitions.get_mut(partition).ok_or_else(|| {
            CoreError::journal_corruption(
                record_offset,
                format!(
                    "write to unknown partition {}",
                    String::from_utf8_lossy(partition)
                ),
            )
        })
    }
}
