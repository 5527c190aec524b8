//! Key selection and the read path.

use super::connection::Connection;
use super::traits::Refiner;
use crate::error::{CoreError, CoreResult};
use crate::types::PartitionName;
use bucketdb_codec::CodecError;
use serde::de::DeserializeOwned;

/// The lookup key carried by a [`Selection`].
#[derive(Debug, Clone)]
pub(crate) enum PendingKey {
    /// `find(None)`: nothing selected.
    None,
    /// Encoded selector.
    Key(Vec<u8>),
    /// The selector failed to encode; reported on read.
    Invalid(CodecError),
}

/// A partition and a selected key, ready to be read.
///
/// Returned by [`crate::Querier::find`]. A selection is an immutable value:
/// reading it any number of times, from any thread, reads the same key.
#[derive(Debug, Clone)]
pub struct Selection {
    conn: Connection,
    partition: PartitionName,
    key: PendingKey,
}

impl Selection {
    pub(crate) fn new(conn: Connection, partition: PartitionName, key: PendingKey) -> Self {
        Self {
            conn,
            partition,
            key,
        }
    }

    /// The partition the selection reads from.
    #[must_use]
    pub fn partition(&self) -> &PartitionName {
        &self.partition
    }

    /// Returns `true` if a key is selected.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !matches!(self.key, PendingKey::None)
    }

    /// Reads the raw value bytes of the selected entry.
    ///
    /// # Errors
    ///
    /// Same as [`Refiner::one`], minus decoding.
    pub fn raw(&self) -> CoreResult<Vec<u8>> {
        let key = match &self.key {
            PendingKey::None => return Err(CoreError::NoKeySelected),
            PendingKey::Invalid(e) => return Err(CoreError::encode(e.clone())),
            PendingKey::Key(key) => key,
        };
        self.conn
            .store()
            .get(self.partition.as_bytes(), key)?
            .ok_or_else(|| CoreError::key_not_found(self.partition.as_bytes()))
    }
}

impl Refiner for Selection {
    fn one<T: DeserializeOwned>(&self) -> CoreResult<T> {
        let bytes = self.raw()?;
        bucketdb_codec::decode(&bytes).map_err(CoreError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Handler, Querier};
    use crate::config::ConnectConfig;
    use crate::error::ErrorKind;
    use serde::{Serialize, Serializer};

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    fn connect() -> Connection {
        Connection::connect(ConnectConfig::new("selection.db")).unwrap()
    }

    #[test]
    fn find_none_selects_nothing() {
        let conn = connect();
        let bucket = conn.exec_on("");
        bucket.insert("k", "v").unwrap();

        let selection = bucket.find::<str>(None);
        assert!(!selection.has_key());
        let err = selection.one::<String>().unwrap_err();
        assert!(matches!(err, CoreError::NoKeySelected));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        conn.close().unwrap();
    }

    #[test]
    fn encode_failure_surfaces_on_read() {
        let conn = connect();
        let selection = conn.exec_on("").find(Some(&Unencodable));
        assert!(selection.has_key());
        assert!(matches!(
            selection.one::<String>(),
            Err(CoreError::Encode { .. })
        ));
        conn.close().unwrap();
    }

    #[test]
    fn missing_entry_is_not_found_not_decode() {
        let conn = connect();
        let err = conn.exec_on("").find(Some("absent")).one::<u64>().unwrap_err();
        assert!(matches!(err, CoreError::KeyNotFound { .. }));
        assert!(err.is_not_found());
        conn.close().unwrap();
    }

    #[test]
    fn wrong_type_is_decode_error() {
        let conn = connect();
        let bucket = conn.exec_on("");
        bucket.insert("k", "text").unwrap();
        let err = bucket.find(Some("k")).one::<u64>().unwrap_err();
        assert!(matches!(err, CoreError::Decode { .. }));
        conn.close().unwrap();
    }

    #[test]
    fn one_into_leaves_destination_on_failure() {
        let conn = connect();
        let bucket = conn.exec_on("");
        bucket.insert("k", &7u64).unwrap();

        let mut out = 1u64;
        bucket.find(Some("absent")).one_into(&mut out).unwrap_err();
        assert_eq!(out, 1);
        bucket.find(Some("k")).one_into(&mut out).unwrap();
        assert_eq!(out, 7);
        conn.close().unwrap();
    }

    #[test]
    fn selection_reads_latest_committed_value() {
        let conn = connect();
        let bucket = conn.exec_on("");
        let selection = bucket.find(Some("k"));

        bucket.insert("k", &1u8).unwrap();
        assert_eq!(selection.one::<u8>().unwrap(), 1);
        bucket.insert("k", &2u8).unwrap();
        assert_eq!(selection.one::<u8>().unwrap(), 2);
        conn.close().unwrap();
    }

    #[test]
    fn read_after_close_fails() {
        let conn = connect();
        let selection = conn.exec_on("").find(Some("k"));
        conn.copy().close().unwrap();
        assert!(matches!(
            selection.one::<u8>(),
            Err(CoreError::ConnectionClosed)
        ));
        assert!(matches!(conn.close(), Err(CoreError::ConnectionClosed)));
    }
}
