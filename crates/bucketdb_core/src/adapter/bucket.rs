//! Partition-bound querier.

use super::connection::Connection;
use super::selection::{PendingKey, Selection};
use super::traits::{Querier, Scan};
use crate::error::{CoreError, CoreResult};
use crate::types::PartitionName;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A connection bound to one partition.
///
/// Returned by [`crate::Handler::exec_on`]. The partition is not checked
/// until an operation runs, so a `Bucket` for a partition that was never
/// created fails each operation with [`CoreError::PartitionNotFound`].
#[derive(Debug, Clone)]
pub struct Bucket {
    conn: Connection,
    partition: PartitionName,
}

impl Bucket {
    pub(crate) fn new(conn: Connection, partition: PartitionName) -> Self {
        Self { conn, partition }
    }

    /// The selected partition.
    #[must_use]
    pub fn partition(&self) -> &PartitionName {
        &self.partition
    }

    /// Returns `true` if the partition exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConnectionClosed`] after close.
    pub fn exists(&self) -> CoreResult<bool> {
        self.conn.store().has_partition(self.partition.as_bytes())
    }
}

impl Querier for Bucket {
    type Refiner = Selection;

    fn insert<K, V>(&self, key: &K, value: &V) -> CoreResult<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let key = bucketdb_codec::encode(key).map_err(CoreError::encode)?;
        let value = bucketdb_codec::encode(value).map_err(CoreError::encode)?;
        self.conn
            .store()
            .put(self.partition.as_bytes(), &key, &value)
    }

    fn remove<S>(&self, selector: &S) -> CoreResult<()>
    where
        S: Serialize + ?Sized,
    {
        let key = bucketdb_codec::encode(selector).map_err(CoreError::encode)?;
        self.conn.store().delete(self.partition.as_bytes(), &key)
    }

    fn find<Q>(&self, query: Option<&Q>) -> Selection
    where
        Q: Serialize + ?Sized,
    {
        let key = match query {
            None => PendingKey::None,
            Some(query) => match bucketdb_codec::encode(query) {
                Ok(key) => PendingKey::Key(key),
                Err(e) => PendingKey::Invalid(e),
            },
        };
        Selection::new(self.conn.clone(), self.partition.clone(), key)
    }
}

impl Scan for Bucket {
    fn all<K, V>(&self) -> CoreResult<Vec<(K, V)>>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        self.conn
            .store()
            .scan(self.partition.as_bytes())?
            .into_iter()
            .map(|(key, value)| -> CoreResult<(K, V)> {
                let key = bucketdb_codec::decode(&key).map_err(CoreError::decode)?;
                let value = bucketdb_codec::decode(&value).map_err(CoreError::decode)?;
                Ok((key, value))
            })
            .collect()
    }

    fn values<V: DeserializeOwned>(&self) -> CoreResult<Vec<V>> {
        self.conn
            .store()
            .scan(self.partition.as_bytes())?
            .into_iter()
            .map(|(_, value)| bucketdb_codec::decode(&value).map_err(CoreError::decode))
            .collect()
    }

    fn count(&self) -> CoreResult<usize> {
        self.conn.store().len(self.partition.as_bytes())
    }
}
