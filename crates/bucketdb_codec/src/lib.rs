//! # BucketDB Codec
//!
//! Deterministic serialization for BucketDB keys and values.
//!
//! Keys are compared by their raw bytes, so the same logical value must
//! always encode to the same bytes. This crate guarantees that by writing a
//! canonical subset of CBOR:
//!
//! - map entries (and therefore struct fields) sorted by encoded key,
//!   length-first then bytewise
//! - shortest-form integers and lengths, covering the full CBOR integer range
//! - floats in the shortest width that keeps their exact value, with a single
//!   NaN encoding
//! - no tags or indefinite-length items
//!
//! The decoder rejects anything outside that subset. Both sides share the
//! depth and size limits in [`MAX_DEPTH`], [`MAX_BYTES_LENGTH`] and
//! [`MAX_CONTAINER_ELEMENTS`], so every value that encodes also decodes.
//!
//! ## Usage
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Profile {
//!     age: u32,
//! }
//!
//! let bytes = bucketdb_codec::encode(&Profile { age: 30 }).unwrap();
//! let back: Profile = bucketdb_codec::decode(&bytes).unwrap();
//! assert_eq!(back, Profile { age: 30 });
//! ```
//!
//! ## Format versioning
//!
//! These rules are frozen as part of on-disk format version 1. Any change to
//! them changes key bytes and requires a new format version.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod limits;
mod typed;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use limits::{MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS, MAX_DEPTH};
pub use typed::{decode, decode_into, encode, from_value, to_value};
pub use value::Value;
