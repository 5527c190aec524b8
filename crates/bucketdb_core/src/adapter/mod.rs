//! The document adapter.
//!
//! Three capabilities let callers work with typed documents without touching
//! the partition store directly:
//!
//! - [`Handler`] manages the lifecycle of a connection and selects partitions
//! - [`Querier`] inserts, removes and selects documents in one partition
//! - [`Refiner`] reads the selected document into a caller type
//!
//! [`Connection`], [`Bucket`] and [`Selection`] implement them. Each chained
//! call returns a new immutable value, so a `Bucket` or `Selection` can be
//! shared between threads and reused freely.
//!
//! Keys and values are serialized with `bucketdb_codec`, so any two equal
//! selectors address the same entry.
//!
//! ```rust
//! use bucketdb_core::{ConnectConfig, Connection, Handler, Querier, Refiner};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     age: u32,
//! }
//!
//! let conn = Connection::connect(ConnectConfig::new("test.db").partition("users")).unwrap();
//! let users = conn.exec_on("users");
//! users.insert("alice", &User { age: 30 }).unwrap();
//!
//! let alice: User = users.find(Some("alice")).one().unwrap();
//! assert_eq!(alice, User { age: 30 });
//!
//! conn.close().unwrap();
//! ```

mod bucket;
mod connection;
mod selection;
mod traits;

pub use bucket::Bucket;
pub use connection::Connection;
pub use selection::Selection;
pub use traits::{Handler, Querier, Refiner, Scan};
