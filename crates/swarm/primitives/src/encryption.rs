//! Chunk encryption.
//!
//! Each chunk gets its own random key. Keystream segment `i` is
//! `keccak256(keccak256(key || u32_le(counter + i)))` and is XORed over the
//! data. Payload segments start at counter 0, the span at counter 128. The
//! transform is its own inverse and preserves length.

use alloy_primitives::{hex, keccak256};
use std::fmt;

use crate::{
    chunk::ContentChunk,
    constants::{BMT_BRANCHES, KEY_SIZE, SEGMENT_SIZE, SPAN_SIZE},
    error::{ChunkError, Result},
};

/// Counter offset used when encrypting the span.
const SPAN_COUNTER: u32 = BMT_BRANCHES as u32;

/// A symmetric chunk encryption key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh key from the thread-local RNG.
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = slice
            .try_into()
            .map_err(|_| ChunkError::size("key must be exactly 32 bytes", slice.len(), KEY_SIZE))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// XOR `data` with the keystream starting at segment `counter`.
    pub fn apply_keystream(&self, data: &mut [u8], counter: u32) {
        let mut input = [0u8; KEY_SIZE + 4];
        input[..KEY_SIZE].copy_from_slice(&self.0);

        for (i, segment) in data.chunks_mut(SEGMENT_SIZE).enumerate() {
            let ctr = counter.wrapping_add(i as u32);
            input[KEY_SIZE..].copy_from_slice(&ctr.to_le_bytes());
            let segment_key = keccak256(keccak256(input));
            for (byte, k) in segment.iter_mut().zip(segment_key.iter()) {
                *byte ^= k;
            }
        }
    }

    /// Encrypt or decrypt a chunk with this key.
    pub fn transform_chunk(&self, chunk: &ContentChunk) -> Result<ContentChunk> {
        let mut span = chunk.span_bytes();
        self.apply_keystream(&mut span, SPAN_COUNTER);

        let mut payload = chunk.payload().to_vec();
        self.apply_keystream(&mut payload, 0);

        ContentChunk::from_parts(span, payload)
    }

    /// Decrypt only the span of an encrypted chunk.
    pub fn decrypt_span(&self, span: [u8; SPAN_SIZE]) -> [u8; SPAN_SIZE] {
        let mut span = span;
        self.apply_keystream(&mut span, SPAN_COUNTER);
        span
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

impl fmt::Display for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_transform_is_involution(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let key = EncryptionKey::random();
            let chunk = ContentChunk::new(data).unwrap();

            let encrypted = key.transform_chunk(&chunk).unwrap();
            prop_assert_eq!(encrypted.payload().len(), chunk.payload().len());

            let decrypted = key.transform_chunk(&encrypted).unwrap();
            prop_assert_eq!(decrypted, chunk);
        }
    }

    #[test]
    fn test_encryption_changes_address() {
        let key = EncryptionKey::new([7u8; 32]);
        let chunk = ContentChunk::new(vec![1u8; 100]).unwrap();
        let encrypted = key.transform_chunk(&chunk).unwrap();

        assert_ne!(encrypted.payload(), chunk.payload());
        assert_ne!(encrypted.address(), chunk.address());
        assert_eq!(key.decrypt_span(encrypted.span_bytes()), chunk.span_bytes());
    }

    #[test]
    fn test_keystream_depends_on_counter() {
        let key = EncryptionKey::new([1u8; 32]);
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        key.apply_keystream(&mut a, 0);
        key.apply_keystream(&mut b, 1);
        assert_ne!(a, b);
    }
}
