//! Journal record types and serialization.

use crate::error::{CoreError, CoreResult};
use crate::types::ValueLocation;
use bucketdb_codec::CodecError;

/// Magic bytes at the start of every database file.
pub const FILE_MAGIC: [u8; 8] = *b"BUCKETDB";

/// On-disk format version, covering both the journal layout and the codec's
/// canonical key encoding.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the file header.
pub const FILE_HEADER_SIZE: usize = 12;

/// Magic bytes at the start of every record.
pub(crate) const RECORD_MAGIC: [u8; 4] = *b"BREC";

/// Record envelope version.
pub(crate) const RECORD_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
pub const RECORD_HEADER_SIZE: usize = 10;

/// Size of the trailing checksum.
pub(crate) const CRC_SIZE: usize = 4;

/// Computes the record checksum (CRC-32, IEEE).
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Builds the file header for the current format version.
pub(crate) fn file_header() -> [u8; FILE_HEADER_SIZE] {
    let mut header = [0u8; FILE_HEADER_SIZE];
    header[..8].copy_from_slice(&FILE_MAGIC);
    header[8..10].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    header
}

/// Validates a file header read from disk.
pub(crate) fn check_file_header(header: &[u8]) -> CoreResult<()> {
    if header.len() < FILE_HEADER_SIZE || header[..8] != FILE_MAGIC {
        return Err(CoreError::invalid_format("not a bucketdb database file"));
    }
    let version = u16::from_le_bytes([header[8], header[9]]);
    if version > FORMAT_VERSION {
        return Err(CoreError::invalid_format(format!(
            "unsupported format version {version}, newest supported is {FORMAT_VERSION}"
        )));
    }
    Ok(())
}

/// Operation kinds inside a record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpKind {
    CreatePartition = 1,
    Put = 2,
    Delete = 3,
}

impl OpKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::CreatePartition),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One mutation inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalOp {
    /// Create a partition if it does not exist.
    CreatePartition {
        /// Partition name.
        name: Vec<u8>,
    },
    /// Insert or overwrite an entry.
    Put {
        /// Target partition.
        partition: Vec<u8>,
        /// Entry key.
        key: Vec<u8>,
        /// Entry value.
        value: Vec<u8>,
    },
    /// Remove an entry.
    Delete {
        /// Target partition.
        partition: Vec<u8>,
        /// Entry key.
        key: Vec<u8>,
    },
}

impl JournalOp {
    fn kind(&self) -> OpKind {
        match self {
            Self::CreatePartition { .. } => OpKind::CreatePartition,
            Self::Put { .. } => OpKind::Put,
            Self::Delete { .. } => OpKind::Delete,
        }
    }
}

/// Position of a `Put` value inside an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    /// Index of the `Put` operation in the record.
    pub op: usize,
    /// Offset of the value from the start of the payload.
    pub offset: usize,
    /// Value length.
    pub len: u32,
}

impl ValueSpan {
    /// Resolves the span to an absolute location given the record's offset.
    #[must_use]
    pub fn locate(&self, record_offset: u64) -> ValueLocation {
        ValueLocation {
            offset: record_offset + (RECORD_HEADER_SIZE + self.offset) as u64,
            len: self.len,
        }
    }
}

/// One committed transaction: an ordered list of operations applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalRecord {
    /// Operations in application order.
    pub ops: Vec<JournalOp>,
}

impl JournalRecord {
    /// Creates a record from operations.
    #[must_use]
    pub fn new(ops: Vec<JournalOp>) -> Self {
        Self { ops }
    }

    /// Creates a record holding a single operation.
    #[must_use]
    pub fn single(op: JournalOp) -> Self {
        Self { ops: vec![op] }
    }

    /// Encodes the full record (envelope, payload and checksum).
    ///
    /// Returns the bytes and the payload spans of every `Put` value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encode`] if a field or the payload exceeds the
    /// 4 GiB length limit.
    pub fn encode(&self) -> CoreResult<(Vec<u8>, Vec<ValueSpan>)> {
        let (payload, spans) = self.encode_payload()?;
        let len = u32::try_from(payload.len()).map_err(|_| too_large(payload.len()))?;

        let mut data = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&RECORD_MAGIC);
        data.extend_from_slice(&RECORD_VERSION.to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = checksum(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        Ok((data, spans))
    }

    /// Serializes the payload.
    pub fn encode_payload(&self) -> CoreResult<(Vec<u8>, Vec<ValueSpan>)> {
        let mut buf = Vec::new();
        let mut spans = Vec::new();

        let count = u32::try_from(self.ops.len()).map_err(|_| too_large(self.ops.len()))?;
        buf.extend_from_slice(&count.to_le_bytes());

        for (index, op) in self.ops.iter().enumerate() {
            buf.push(op.kind() as u8);
            match op {
                JournalOp::CreatePartition { name } => {
                    put_field(&mut buf, name)?;
                }
                JournalOp::Put {
                    partition,
                    key,
                    value,
                } => {
                    put_field(&mut buf, partition)?;
                    put_field(&mut buf, key)?;
                    let len = put_field(&mut buf, value)?;
                    spans.push(ValueSpan {
                        op: index,
                        offset: buf.len() - value.len(),
                        len,
                    });
                }
                JournalOp::Delete { partition, key } => {
                    put_field(&mut buf, partition)?;
                    put_field(&mut buf, key)?;
                }
            }
        }

        Ok((buf, spans))
    }

    /// Deserializes a payload. `record_offset` is only used in error reports.
    pub fn decode_payload(payload: &[u8], record_offset: u64) -> CoreResult<(Self, Vec<ValueSpan>)> {
        let mut cursor = PayloadCursor {
            payload,
            pos: 0,
            record_offset,
        };

        let count = cursor.read_u32()? as usize;
        // Each op needs at least a kind byte and one length prefix.
        if count > payload.len() / 5 {
            return Err(CoreError::journal_corruption(
                record_offset,
                format!("operation count {count} exceeds payload size"),
            ));
        }

        let mut ops = Vec::with_capacity(count);
        let mut spans = Vec::new();

        for index in 0..count {
            let kind_byte = cursor.read_u8()?;
            let kind = OpKind::from_byte(kind_byte).ok_or_else(|| {
                CoreError::journal_corruption(
                    record_offset,
                    format!("unknown operation kind {kind_byte}"),
                )
            })?;

            let op = match kind {
                OpKind::CreatePartition => JournalOp::CreatePartition {
                    name: cursor.read_field()?.to_vec(),
                },
                OpKind::Put => {
                    let partition = cursor.read_field()?.to_vec();
                    let key = cursor.read_field()?.to_vec();
                    let value = cursor.read_field()?;
                    // read_field bounds values to u32 lengths
                    #[allow(clippy::cast_possible_truncation)]
                    let len = value.len() as u32;
                    spans.push(ValueSpan {
                        op: index,
                        offset: cursor.pos - value.len(),
                        len,
                    });
                    JournalOp::Put {
                        partition,
                        key,
                        value: value.to_vec(),
                    }
                }
                OpKind::Delete => JournalOp::Delete {
                    partition: cursor.read_field()?.to_vec(),
                    key: cursor.read_field()?.to_vec(),
                },
            };
            ops.push(op);
        }

        if cursor.pos != payload.len() {
            return Err(CoreError::journal_corruption(
                record_offset,
                format!(
                    "trailing bytes in record: used {} of {}",
                    cursor.pos,
                    payload.len()
                ),
            ));
        }

        Ok((Self { ops }, spans))
    }
}

fn too_large(len: usize) -> CoreError {
    CoreError::encode(CodecError::SizeLimitExceeded {
        claimed: len as u64,
        max_allowed: u64::from(u32::MAX),
    })
}

fn put_field(buf: &mut Vec<u8>, field: &[u8]) -> CoreResult<u32> {
    let len = u32::try_from(field.len()).map_err(|_| too_large(field.len()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(field);
    Ok(len)
}

struct PayloadCursor<'a> {
    payload: &'a [u8],
    pos: usize,
    record_offset: u64,
}

impl<'a> PayloadCursor<'a> {
    fn take(&mut self, len: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| {
                CoreError::journal_corruption(self.record_offset, "unexpected end of payload")
            })?;
        let payload: &'a [u8] = self.payload;
        let slice = &payload[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> CoreResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_field(&mut self) -> CoreResult<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JournalRecord {
        JournalRecord::new(vec![
            JournalOp::CreatePartition {
                name: b"users".to_vec(),
            },
            JournalOp::Put {
                partition: b"users".to_vec(),
                key: b"alice".to_vec(),
                value: b"{age:30}".to_vec(),
            },
            JournalOp::Delete {
                partition: b"users".to_vec(),
                key: b"bob".to_vec(),
            },
            JournalOp::Put {
                partition: b"default".to_vec(),
                key: vec![],
                value: vec![],
            },
        ])
    }

    #[test]
    fn payload_roundtrip_with_spans() {
        let record = sample();
        let (payload, spans) = record.encode_payload().unwrap();
        let (decoded, decoded_spans) = JournalRecord::decode_payload(&payload, 0).unwrap();

        assert_eq!(decoded, record);
        assert_eq!(spans, decoded_spans);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].op, 1);
        let first = &payload[spans[0].offset..spans[0].offset + spans[0].len as usize];
        assert_eq!(first, b"{age:30}");
        assert_eq!(spans[1].len, 0);
    }

    #[test]
    fn create_partition_payload_layout() {
        let record = JournalRecord::single(JournalOp::CreatePartition {
            name: b"users".to_vec(),
        });
        let (payload, spans) = record.encode_payload().unwrap();

        let mut expected = 1u32.to_le_bytes().to_vec();
        expected.push(OpKind::CreatePartition as u8);
        expected.extend_from_slice(&5u32.to_le_bytes());
        expected.extend_from_slice(b"users");
        assert_eq!(payload, expected);
        assert!(spans.is_empty());
    }

    #[test]
    fn envelope_layout() {
        let record = JournalRecord::single(JournalOp::CreatePartition {
            name: b"x".to_vec(),
        });
        let (bytes, _) = record.encode().unwrap();
        let (payload, _) = record.encode_payload().unwrap();

        assert_eq!(&bytes[..4], b"BREC");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), RECORD_VERSION);
        assert_eq!(
            u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize,
            payload.len()
        );
        let body_end = bytes.len() - CRC_SIZE;
        let stored = u32::from_le_bytes(bytes[body_end..].try_into().unwrap());
        assert_eq!(stored, checksum(&bytes[..body_end]));
    }

    #[test]
    fn span_locates_value_in_envelope() {
        let record = sample();
        let (bytes, spans) = record.encode().unwrap();
        let location = spans[0].locate(100);
        let start = (location.offset - 100) as usize;
        assert_eq!(&bytes[start..start + location.len as usize], b"{age:30}");
    }

    #[test]
    fn unknown_kind_is_corruption() {
        let mut payload = 1u32.to_le_bytes().to_vec();
        payload.push(9);
        payload.extend_from_slice(&0u32.to_le_bytes());
        let err = JournalRecord::decode_payload(&payload, 42).unwrap_err();
        assert!(matches!(err, CoreError::JournalCorruption { offset: 42, .. }));
    }

    #[test]
    fn short_and_trailing_payloads_are_corruption() {
        let (payload, _) = sample().encode_payload().unwrap();
        assert!(JournalRecord::decode_payload(&payload[..payload.len() - 1], 0).is_err());

        let mut extended = payload.clone();
        extended.push(0);
        assert!(JournalRecord::decode_payload(&extended, 0).is_err());
    }

    #[test]
    fn absurd_op_count_is_corruption() {
        let payload = u32::MAX.to_le_bytes();
        assert!(JournalRecord::decode_payload(&payload, 0).is_err());
    }

    #[test]
    fn file_header_checks() {
        let header = file_header();
        assert!(check_file_header(&header).is_ok());

        let mut future = header;
        future[8..10].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            check_file_header(&future),
            Err(CoreError::InvalidFormat { .. })
        ));

        assert!(check_file_header(b"SQLite format 3\0").is_err());
        assert!(check_file_header(&header[..4]).is_err());
    }

    #[test]
    fn crc_known_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }
}
