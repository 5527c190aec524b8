//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The serde serializer rejected the value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the failure.
        message: String,
    },

    /// The bytes are valid CBOR but do not fit the destination type.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the failure.
        message: String,
    },

    /// Indefinite-length items are not canonical.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// A text string is not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// The input ended inside an item.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The input is not canonical CBOR.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// Description of the structural problem.
        message: String,
    },

    /// The value uses a CBOR feature outside the supported subset.
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported construct.
        type_name: String,
    },

    /// An integer is outside the CBOR range `-2^64 ..= 2^64 - 1`.
    #[error("integer outside the CBOR integer range")]
    IntegerOverflow,

    /// A string or container length exceeds the codec's limit.
    #[error("declared length {claimed} exceeds limit {max_allowed}")]
    SizeLimitExceeded {
        /// Length declared by the input.
        claimed: u64,
        /// Configured maximum.
        max_allowed: u64,
    },

    /// Bytes remain after the top-level item.
    #[error("{remaining} trailing bytes after value")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
}

impl CodecError {
    /// Creates an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Creates a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}
