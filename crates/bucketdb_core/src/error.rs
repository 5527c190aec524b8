//! Error types for BucketDB core.

use bucketdb_codec::CodecError;
use bucketdb_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by the partition store and the document adapter.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The connect configuration is malformed.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with it.
        message: String,
    },

    /// The database file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    OpenFailed {
        /// The database file.
        path: PathBuf,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// Another handle holds the database file.
    #[error("database locked: {} is held by another handle", path.display())]
    DatabaseLocked {
        /// The database file.
        path: PathBuf,
    },

    /// The file is not a database of a supported format version.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The journal holds a structurally invalid record.
    #[error("journal corruption at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A journal record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the offending record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// The partition was never created.
    #[error("partition not found: {name}")]
    PartitionNotFound {
        /// Partition name, lossily decoded for display.
        name: String,
    },

    /// A key or value could not be serialized.
    #[error("encode failed: {source}")]
    Encode {
        /// Codec failure.
        #[source]
        source: CodecError,
    },

    /// Stored bytes could not be decoded into the requested type.
    #[error("decode failed: {source}")]
    Decode {
        /// Codec failure.
        #[source]
        source: CodecError,
    },

    /// No entry exists under the selected key.
    #[error("key not found in partition {partition}")]
    KeyNotFound {
        /// Partition searched, lossily decoded for display.
        partition: String,
    },

    /// A read was requested on a selection without a key.
    #[error("no lookup key selected")]
    NoKeySelected,

    /// A write transaction could not be committed. Nothing was applied.
    #[error("write failed: {source}")]
    WriteFailed {
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// The database file handle could not be released.
    #[error("close failed: {source}")]
    CloseFailed {
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// The ephemeral directory could not be removed after close.
    #[error("cannot remove temporary directory {}: {source}", path.display())]
    DirectoryCleanup {
        /// The directory.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// The connection has already been closed.
    #[error("connection is closed")]
    ConnectionClosed,

    /// Storage backend error outside open, commit and close.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of [`CoreError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing connect arguments.
    Config,
    /// The database file cannot be opened, locked, created or recovered.
    Open,
    /// The operation targets a partition that was never created.
    NoPartition,
    /// Serialization failure.
    Encode,
    /// Deserialization failure.
    Decode,
    /// The lookup key is absent (or was never selected).
    NotFound,
    /// A transaction could not commit.
    Write,
    /// The file handle or the temporary directory could not be released.
    Close,
    /// The connection is closed.
    Closed,
    /// Other storage or I/O failure.
    Io,
}

impl CoreError {
    /// Returns the class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } => ErrorKind::Config,
            Self::OpenFailed { .. }
            | Self::DatabaseLocked { .. }
            | Self::InvalidFormat { .. }
            | Self::JournalCorruption { .. }
            | Self::ChecksumMismatch { .. } => ErrorKind::Open,
            Self::PartitionNotFound { .. } => ErrorKind::NoPartition,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::KeyNotFound { .. } | Self::NoKeySelected => ErrorKind::NotFound,
            Self::WriteFailed { .. } => ErrorKind::Write,
            Self::CloseFailed { .. } | Self::DirectoryCleanup { .. } => ErrorKind::Close,
            Self::ConnectionClosed => ErrorKind::Closed,
            Self::Storage(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` if the selected key has no entry.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a partition not found error.
    pub fn partition_not_found(name: &[u8]) -> Self {
        Self::PartitionNotFound {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates a key not found error.
    pub fn key_not_found(partition: &[u8]) -> Self {
        Self::KeyNotFound {
            partition: String::from_utf8_lossy(partition).into_owned(),
        }
    }

    /// Wraps a codec failure raised while encoding.
    pub fn encode(source: CodecError) -> Self {
        Self::Encode { source }
    }

    /// Wraps a codec failure raised while decoding.
    pub fn decode(source: CodecError) -> Self {
        Self::Decode { source }
    }

    /// Maps a storage failure during open, keeping lock contention distinct.
    pub fn open_failed(path: PathBuf, source: StorageError) -> Self {
        match source {
            StorageError::Locked { .. } => Self::DatabaseLocked { path },
            source => Self::OpenFailed { path, source },
        }
    }
}
