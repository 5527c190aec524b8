//! Size limits shared by the encoder and decoder.
//!
//! Both sides enforce the same bounds, so anything the encoder emits the
//! decoder accepts.

/// Maximum element count of an array or map.
pub const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum byte length of a byte or text string.
pub const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// Maximum nesting depth of arrays and maps. A top-level container is depth 1.
pub const MAX_DEPTH: usize = 256;
