//! # BucketDB Storage
//!
//! Byte-level storage backends for BucketDB.
//!
//! A backend is an opaque, append-only byte store: it can read a range, append,
//! flush, sync, truncate and close. It knows nothing about partitions,
//! journal records or the codec; `bucketdb_core` owns the file format.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - a single database file, locked exclusively while open
//! - [`InMemoryBackend`] - a growable buffer for tests and scratch stores
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"bucket").unwrap();
//! assert_eq!(backend.read_at(offset, 6).unwrap(), b"bucket");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
