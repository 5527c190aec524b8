//! # BucketDB Core
//!
//! A document store over a single-file, partitioned key-value engine.
//!
//! This crate provides:
//! - An append-only journal with checksummed records and crash recovery
//! - The [`PartitionStore`]: named partitions of byte-keyed entries, each
//!   mutation its own durable transaction
//! - The document adapter: [`Handler`], [`Querier`] and [`Refiner`], which
//!   store and load serde types through `bucketdb_codec`
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_core::{ConnectConfig, Connection, Handler, Querier, Refiner};
//!
//! let conn = Connection::connect(ConnectConfig::new("app.db").partition("users")).unwrap();
//! let users = conn.exec_on("users");
//!
//! users.insert("alice", &30u32).unwrap();
//! assert_eq!(users.find(Some("alice")).one::<u32>().unwrap(), 30);
//!
//! users.remove("alice").unwrap();
//! assert!(users.find(Some("alice")).one::<u32>().unwrap_err().is_not_found());
//!
//! conn.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod dir;
mod error;
pub mod journal;
mod stats;
mod store;
mod types;

#[cfg(test)]
mod test_support;

pub use adapter::{Bucket, Connection, Handler, Querier, Refiner, Scan, Selection};
pub use config::ConnectConfig;
pub use dir::DatabaseDir;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use stats::{CompactionStats, StoreCounters, StoreStats};
pub use store::{PartitionIndex, PartitionStore, StoreOptions};
pub use types::{PartitionName, ValueLocation, DEFAULT_PARTITION};
