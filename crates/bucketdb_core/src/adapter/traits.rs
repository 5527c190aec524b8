//! Capability traits of the document adapter.

use crate::error::CoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Lifecycle of an open database.
pub trait Handler: Sized {
    /// The partition handle returned by [`Handler::exec_on`].
    type Querier: Querier;

    /// Returns another handle sharing the same open database.
    fn copy(&self) -> Self;

    /// Closes the database for every handle sharing it.
    ///
    /// # Errors
    ///
    /// Fails if the file could not be released, if a temporary directory
    /// could not be removed, or if the database was already closed.
    fn close(self) -> CoreResult<()>;

    /// Selects a partition by name. An empty name selects the default
    /// partition. Existence is checked by the operations, not here.
    fn exec_on(&self, partition: &str) -> Self::Querier;
}

/// Single-key operations on one partition.
pub trait Querier {
    /// The selection returned by [`Querier::find`].
    type Refiner: Refiner;

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Fails if either side cannot be encoded, the partition does not exist,
    /// or the write cannot be committed.
    fn insert<K, V>(&self, key: &K, value: &V) -> CoreResult<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized;

    /// Removes the entry addressed by `selector`. Removing an absent entry
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Fails if the selector cannot be encoded, the partition does not exist,
    /// or the write cannot be committed.
    fn remove<S>(&self, selector: &S) -> CoreResult<()>
    where
        S: Serialize + ?Sized;

    /// Selects the entry addressed by `query` for a later read.
    ///
    /// `None` selects nothing. Nothing is read or validated until the
    /// returned refiner is used.
    fn find<Q>(&self, query: Option<&Q>) -> Self::Refiner
    where
        Q: Serialize + ?Sized;
}

/// Reads a selected entry.
pub trait Refiner {
    /// Reads and decodes the selected entry.
    ///
    /// # Errors
    ///
    /// Fails if no key is selected, the key could not be encoded, the
    /// partition or entry does not exist, or the stored bytes do not decode
    /// into `T`.
    fn one<T: DeserializeOwned>(&self) -> CoreResult<T>;

    /// Reads the selected entry into `out`. On any failure `out` is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`Refiner::one`].
    fn one_into<T: DeserializeOwned>(&self, out: &mut T) -> CoreResult<()> {
        *out = self.one()?;
        Ok(())
    }
}

/// Whole-partition reads.
///
/// This is the only multi-entry access the adapter offers: no filters, no
/// distinct values, no bulk writes.
pub trait Scan {
    /// Every entry in key-byte order.
    ///
    /// # Errors
    ///
    /// Fails if the partition does not exist or any entry does not decode.
    fn all<K, V>(&self) -> CoreResult<Vec<(K, V)>>
    where
        K: DeserializeOwned,
        V: DeserializeOwned;

    /// Every value in key-byte order.
    ///
    /// # Errors
    ///
    /// Same as [`Scan::all`].
    fn values<V: DeserializeOwned>(&self) -> CoreResult<Vec<V>>;

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// Fails if the partition does not exist.
    fn count(&self) -> CoreResult<usize>;
}
