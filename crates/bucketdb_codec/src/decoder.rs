//! Canonical CBOR decoder.

use crate::encoder::write_float;
use crate::error::{CodecError, CodecResult};
use crate::limits::{MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS, MAX_DEPTH};
use crate::value::{canonical_order, Value};
use std::cmp::Ordering;

/// Decodes exactly one canonical CBOR item from `bytes`.
///
/// # Errors
///
/// Fails if the input is truncated, has trailing bytes, is not in canonical
/// form, exceeds the size limits, or uses tags or indefinite lengths.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// A strict reader over canonical CBOR input.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Creates a decoder positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Returns `true` when all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the unread input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Decodes the next item.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;

        match major {
            0 => Ok(Value::Integer(i128::from(self.argument(info)?))),
            1 => Ok(Value::Integer(-1 - i128::from(self.argument(info)?))),
            2 => {
                let len = self.length(info, MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            3 => {
                let len = self.length(info, MAX_BYTES_LENGTH)?;
                let text = std::str::from_utf8(self.take(len)?)
                    .map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            4 => {
                let len = self.length(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|decoder| {
                    let mut items = Vec::with_capacity(len.min(1024));
                    for _ in 0..len {
                        items.push(decoder.decode()?);
                    }
                    Ok(Value::Array(items))
                })
            }
            5 => {
                let len = self.length(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|decoder| decoder.decode_map(len))
            }
            6 => Err(CodecError::unsupported_type("tagged item")),
            _ => self.decode_simple(info),
        }
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads a head argument and rejects any non-shortest form.
    fn argument(&mut self, info: u8) -> CodecResult<u64> {
        let (value, floor) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.take(1)?[0]), 24),
            25 => {
                let b = self.take(2)?;
                (u64::from(u16::from_be_bytes([b[0], b[1]])), 1 << 8)
            }
            26 => {
                let b = self.take(4)?;
                (u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])), 1 << 16)
            }
            27 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                (u64::from_be_bytes(raw), 1 << 32)
            }
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };
        if value < floor {
            return Err(CodecError::invalid_structure(
                "non-canonical: argument could be encoded in fewer bytes",
            ));
        }
        Ok(value)
    }

    fn length(&mut self, info: u8, max_allowed: u64) -> CodecResult<usize> {
        let claimed = self.argument(info)?;
        if claimed > max_allowed {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded {
            claimed,
            max_allowed,
        })
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::invalid_structure("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn decode_map(&mut self, len: usize) -> CodecResult<Value> {
        let mut pairs = Vec::with_capacity(len.min(1024));
        let mut previous: Option<&'a [u8]> = None;

        for _ in 0..len {
            let start = self.pos;
            let key = self.decode()?;
            let data: &'a [u8] = self.data;
            let encoded_key = &data[start..self.pos];

            // Strictly increasing also rules out duplicates.
            if let Some(prev) = previous {
                if canonical_order(prev, encoded_key) != Ordering::Less {
                    return Err(CodecError::invalid_structure(
                        "non-canonical: map keys out of order or duplicated",
                    ));
                }
            }
            previous = Some(encoded_key);

            let value = self.decode()?;
            pairs.push((key, value));
        }

        Ok(Value::Map(pairs))
    }

    fn decode_simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            25..=27 => self.decode_float(info),
            31 => Err(CodecError::invalid_structure("unexpected break")),
            other => Err(CodecError::unsupported_type(format!("simple value {other}"))),
        }
    }

    /// Reads a float and rejects it unless it is in its shortest exact width.
    fn decode_float(&mut self, info: u8) -> CodecResult<Value> {
        let start = self.pos - 1;
        let value = match info {
            25 => {
                let b = self.take(2)?;
                half_to_f64(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4)?;
                f64::from(f32::from_bits(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            _ => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                f64::from_bits(u64::from_be_bytes(raw))
            }
        };

        let mut canonical = Vec::with_capacity(9);
        write_float(&mut canonical, value);
        if canonical[..] != self.data[start..self.pos] {
            return Err(CodecError::invalid_structure(
                "non-canonical: float could be encoded in fewer bytes or is a non-canonical NaN",
            ));
        }
        Ok(Value::Float(value))
    }
}

fn half_to_f64(half: u16) -> f64 {
    let exponent = i32::from((half >> 10) & 0x1f);
    let mantissa = f64::from(half & 0x03ff);
    let magnitude = match exponent {
        0 => mantissa * 2f64.powi(-24),
        31 if mantissa == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (mantissa + 1024.0) * 2f64.powi(exponent - 25),
    };
    if half & 0x8000 == 0 {
        magnitude
    } else {
        -magnitude
    }
}
