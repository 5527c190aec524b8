//! Core type definitions.

use std::fmt;

/// Name of the partition that exists in every database.
pub const DEFAULT_PARTITION: &str = "default";

/// Name of a partition, stored as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionName(Vec<u8>);

impl PartitionName {
    /// Creates a partition name from raw bytes.
    #[must_use]
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    /// Resolves a caller-supplied name; an empty name selects the default.
    #[must_use]
    pub fn select(name: &str) -> Self {
        if name.is_empty() {
            Self::default_partition()
        } else {
            Self::new(name)
        }
    }

    /// The default partition.
    #[must_use]
    pub fn default_partition() -> Self {
        Self::new(DEFAULT_PARTITION)
    }

    /// Returns the raw name.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Where a value's bytes live in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLocation {
    /// Absolute offset of the first value byte.
    pub offset: u64,
    /// Length of the value.
    pub len: u32,
}
