//! Serde bridge: typed Rust values to and from canonical bytes.
//!
//! Serialization goes through `ciborium`'s dynamic value so any `Serialize`
//! type works, then narrows it to [`Value`] where tags are refused. Decoding
//! runs the strict canonical decoder first and only then hands the value to
//! `Deserialize`.

use crate::decoder::from_cbor;
use crate::encoder::to_canonical_cbor;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::{Integer as CborInteger, Value as CborValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes any serializable value to canonical bytes.
///
/// Equal values always encode to identical bytes: struct fields and map
/// entries are written in canonical key order regardless of declaration or
/// iteration order.
///
/// # Errors
///
/// Returns an error if serialization fails, the value contains tags or
/// duplicate map keys, or it exceeds the codec's depth and size limits.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
///
/// let mut a = HashMap::new();
/// a.insert("x", 1);
/// a.insert("y", 2);
/// let mut b = HashMap::new();
/// b.insert("y", 2);
/// b.insert("x", 1);
///
/// assert_eq!(bucketdb_codec::encode(&a).unwrap(), bucketdb_codec::encode(&b).unwrap());
/// ```
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    to_canonical_cbor(&to_value(value)?)
}

/// Decodes canonical bytes into a new `T`.
///
/// # Errors
///
/// Returns an error if the bytes are not canonical CBOR or do not match the
/// shape of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    from_value(from_cbor(bytes)?)
}

/// Decodes canonical bytes into an existing destination.
///
/// `out` is only written when decoding succeeds.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_into<T: DeserializeOwned>(bytes: &[u8], out: &mut T) -> CodecResult<()> {
    *out = decode(bytes)?;
    Ok(())
}

/// Converts a serializable value into the dynamic [`Value`] model.
///
/// # Errors
///
/// See [`encode`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    let cbor =
        CborValue::serialized(value).map_err(|err| CodecError::encoding_failed(err.to_string()))?;
    narrow(cbor)
}

/// Converts a dynamic [`Value`] into a deserializable type.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the shapes do not match, and
/// [`CodecError::IntegerOverflow`] for a hand-built integer outside the CBOR
/// range.
pub fn from_value<T: DeserializeOwned>(value: Value) -> CodecResult<T> {
    widen(value)?
        .deserialized()
        .map_err(|err| CodecError::decoding_failed(err.to_string()))
}

fn narrow(cbor: CborValue) -> CodecResult<Value> {
    match cbor {
        CborValue::Null => Ok(Value::Null),
        CborValue::Bool(b) => Ok(Value::Bool(b)),
        CborValue::Integer(n) => Ok(Value::Integer(i128::from(n))),
        CborValue::Float(f) => Ok(Value::Float(f)),
        CborValue::Bytes(bytes) => Ok(Value::Bytes(bytes)),
        CborValue::Text(text) => Ok(Value::Text(text)),
        CborValue::Array(items) => items
            .into_iter()
            .map(narrow)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        CborValue::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((narrow(k)?, narrow(v)?)))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::map),
        CborValue::Tag(tag, _) => Err(CodecError::unsupported_type(format!("tag {tag}"))),
        #[allow(unreachable_patterns)]
        _ => Err(CodecError::unsupported_type("unknown CBOR value")),
    }
}

fn widen(value: Value) -> CodecResult<CborValue> {
    Ok(match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(b),
        Value::Integer(n) => CborValue::Integer(
            CborInteger::try_from(n).map_err(|_| CodecError::IntegerOverflow)?,
        ),
        Value::Float(f) => CborValue::Float(f),
        Value::Bytes(bytes) => CborValue::Bytes(bytes),
        Value::Text(text) => CborValue::Text(text),
        Value::Array(items) => CborValue::Array(
            items
                .into_iter()
                .map(widen)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Value::Map(pairs) => CborValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((widen(k)?, widen(v)?)))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
    })
}
