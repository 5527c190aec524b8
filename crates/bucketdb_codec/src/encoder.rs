//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::limits::{MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS, MAX_DEPTH};
use crate::value::{canonical_order, Value};

/// Encodes a value to canonical CBOR bytes.
///
/// Output is deterministic: integers and lengths use the shortest head,
/// floats the shortest width that keeps their exact value, and map entries
/// are written in canonical key order (shorter encoded key first, then
/// bytewise), so two equal values always produce identical bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if a map contains the same key twice
/// or nesting exceeds the decoder's depth limit,
/// [`CodecError::SizeLimitExceeded`] for strings or containers the decoder
/// would refuse, and [`CodecError::IntegerOverflow`] for integers outside the
/// CBOR range.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// Incremental canonical CBOR writer.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl CanonicalEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(false) => self.buffer.push(0xf4),
            Value::Bool(true) => self.buffer.push(0xf5),
            Value::Integer(n) => self.integer(*n)?,
            Value::Float(f) => write_float(&mut self.buffer, *f),
            Value::Bytes(bytes) => {
                self.head(2, bounded(bytes.len(), MAX_BYTES_LENGTH)?);
                self.buffer.extend_from_slice(bytes);
            }
            Value::Text(text) => {
                self.head(3, bounded(text.len(), MAX_BYTES_LENGTH)?);
                self.buffer.extend_from_slice(text.as_bytes());
            }
            Value::Array(items) => {
                let len = bounded(items.len(), MAX_CONTAINER_ELEMENTS)?;
                self.nested(|encoder| {
                    encoder.head(4, len);
                    for item in items {
                        encoder.encode(item)?;
                    }
                    Ok(())
                })?;
            }
            Value::Map(pairs) => {
                let len = bounded(pairs.len(), MAX_CONTAINER_ELEMENTS)?;
                self.nested(|encoder| encoder.encode_map(len, pairs))?;
            }
        }
        Ok(())
    }

    /// Returns the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn integer(&mut self, n: i128) -> CodecResult<()> {
        if n >= 0 {
            let arg = u64::try_from(n).map_err(|_| CodecError::IntegerOverflow)?;
            self.head(0, arg);
        } else {
            // major type 1 stores -1 - n
            let arg = u64::try_from(-1 - n).map_err(|_| CodecError::IntegerOverflow)?;
            self.head(1, arg);
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn head(&mut self, major: u8, arg: u64) {
        let major = major << 5;
        if arg < 24 {
            self.buffer.push(major | arg as u8);
        } else if arg <= u64::from(u8::MAX) {
            self.buffer.extend_from_slice(&[major | 24, arg as u8]);
        } else if arg <= u64::from(u16::MAX) {
            self.buffer.push(major | 25);
            self.buffer.extend_from_slice(&(arg as u16).to_be_bytes());
        } else if arg <= u64::from(u32::MAX) {
            self.buffer.push(major | 26);
            self.buffer.extend_from_slice(&(arg as u32).to_be_bytes());
        } else {
            self.buffer.push(major | 27);
            self.buffer.extend_from_slice(&arg.to_be_bytes());
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<()>) -> CodecResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::encoding_failed(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn encode_map(&mut self, len: u64, pairs: &[(Value, Value)]) -> CodecResult<()> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            entries.push((self.encode_key(key)?, value));
        }
        entries.sort_by(|a, b| canonical_order(&a.0, &b.0));

        if entries.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(CodecError::encoding_failed("duplicate map key"));
        }

        self.head(5, len);
        for (key, value) in entries {
            self.buffer.extend_from_slice(&key);
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encodes a map key on its own, at the depth of the enclosing map.
    fn encode_key(&self, key: &Value) -> CodecResult<Vec<u8>> {
        let mut encoder = CanonicalEncoder {
            buffer: Vec::new(),
            depth: self.depth,
        };
        encoder.encode(key)?;
        Ok(encoder.buffer)
    }
}

/// Checks a string or container length against the decoder's limit.
fn bounded(len: usize, max_allowed: u64) -> CodecResult<u64> {
    let claimed = u64::try_from(len).unwrap_or(u64::MAX);
    if claimed > max_allowed {
        return Err(CodecError::SizeLimitExceeded {
            claimed,
            max_allowed,
        });
    }
    Ok(claimed)
}

/// Writes a float in the shortest of half, single or double width that
/// preserves its exact value. Every NaN is written as `0xf9 0x7e00`.
pub(crate) fn write_float(out: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        out.extend_from_slice(&[0xf9, 0x7e, 0x00]);
        return;
    }

    #[allow(clippy::cast_possible_truncation)]
    let single = value as f32;
    if f64::from(single).to_bits() != value.to_bits() {
        out.push(0xfb);
        out.extend_from_slice(&value.to_bits().to_be_bytes());
    } else if let Some(half) = half_bits(single) {
        out.push(0xf9);
        out.extend_from_slice(&half.to_be_bytes());
    } else {
        out.push(0xfa);
        out.extend_from_slice(&single.to_bits().to_be_bytes());
    }
}

/// IEEE 754 half-precision bits of `value`, if it converts without loss.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn half_bits(value: f32) -> Option<u16> {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    match exponent {
        // infinity; NaN never gets here
        0xff => (mantissa == 0).then_some(sign | 0x7c00),
        // zero; single subnormals are far below the half range
        0 => (mantissa == 0).then_some(sign),
        _ => match exponent - 127 {
            unbiased @ -14..=15 => (mantissa & 0x1fff == 0)
                .then(|| sign | (((unbiased + 15) as u16) << 10) | (mantissa >> 13) as u16),
            unbiased @ -24..=-15 => {
                let significand = mantissa | 0x0080_0000;
                let shift = (-1 - unbiased) as u32;
                (significand & ((1 << shift) - 1) == 0)
                    .then(|| sign | (significand >> shift) as u16)
            }
            _ => None,
        },
    }
}
