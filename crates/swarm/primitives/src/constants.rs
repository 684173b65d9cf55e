//! Sizes shared by every content chunk.

/// Size of a keccak256 digest and of a plain reference.
pub const HASH_SIZE: usize = 32;

/// Size of a BMT segment (same as hash size).
pub const SEGMENT_SIZE: usize = HASH_SIZE;

/// Size of the span prefix carried by every chunk.
pub const SPAN_SIZE: usize = 8;

/// Number of segments a chunk payload is split into for BMT hashing.
pub const BMT_BRANCHES: usize = 128;

/// Maximum payload size of a chunk.
pub const CHUNK_SIZE: usize = BMT_BRANCHES * SEGMENT_SIZE;

/// Maximum size of a chunk on the wire (span plus payload).
pub const MAX_CHUNK_SIZE: usize = SPAN_SIZE + CHUNK_SIZE;

/// Size of a chunk encryption key.
pub const KEY_SIZE: usize = 32;

/// Size of an encrypted reference (address followed by key).
pub const ENCRYPTED_REFERENCE_SIZE: usize = HASH_SIZE + KEY_SIZE;

/// Length of a segment pair hashed at the bottom of the BMT.
pub(crate) const SEGMENT_PAIR_LENGTH: usize = 2 * SEGMENT_SIZE;
