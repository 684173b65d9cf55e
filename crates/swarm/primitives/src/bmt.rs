//! Binary Merkle Tree hashing of chunk payloads.
//!
//! A payload is zero-padded to [`CHUNK_SIZE`], split into 32-byte segments and
//! paired with keccak256 up to a single root. The chunk address is then
//! `keccak256(span_le || root)`.

use alloy_primitives::{B256, Keccak256, keccak256};

use crate::{
    address::ChunkAddress,
    constants::{CHUNK_SIZE, HASH_SIZE, SEGMENT_PAIR_LENGTH, SPAN_SIZE},
    error::{ChunkError, Result},
};

/// BMT hasher for a single chunk.
///
/// Halves of the tree are hashed in parallel with rayon.
#[derive(Debug, Clone, Default)]
pub struct BmtHasher {
    span: [u8; SPAN_SIZE],
}

impl BmtHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw span bytes, used for encrypted and parity chunks whose
    /// span is not a plain length.
    pub fn set_span_bytes(&mut self, span: [u8; SPAN_SIZE]) {
        self.span = span;
    }

    /// Hash `payload` and return the chunk address.
    pub fn chunk_address(&self, payload: &[u8]) -> Result<ChunkAddress> {
        if payload.len() > CHUNK_SIZE {
            return Err(ChunkError::size(
                "payload exceeds chunk size",
                payload.len(),
                CHUNK_SIZE,
            ));
        }
        Ok(self.address_of(payload))
    }

    /// Address of a payload already known to fit a chunk.
    pub(crate) fn address_of(&self, payload: &[u8]) -> ChunkAddress {
        self.hash(payload).into()
    }

    /// BMT root of the zero-padded payload, without span.
    pub fn root(payload: &[u8]) -> [u8; HASH_SIZE] {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let len = payload.len().min(CHUNK_SIZE);
        buffer[..len].copy_from_slice(&payload[..len]);
        hash_helper_parallel(&buffer)
    }

    fn hash(&self, payload: &[u8]) -> B256 {
        let root = Self::root(payload);

        let mut hasher = Keccak256::new();
        hasher.update(self.span);
        hasher.update(root);
        hasher.finalize()
    }
}

fn hash_helper_parallel(data: &[u8]) -> [u8; HASH_SIZE] {
    if data.len() == SEGMENT_PAIR_LENGTH {
        return *keccak256(data);
    }

    let (left, right) = data.split_at(data.len() / 2);
    let (left_hash, right_hash) =
        rayon::join(|| hash_helper_parallel(left), || hash_helper_parallel(right));

    let mut pair = [0u8; 2 * HASH_SIZE];
    pair[..HASH_SIZE].copy_from_slice(&left_hash);
    pair[HASH_SIZE..].copy_from_slice(&right_hash);
    *keccak256(pair)
}
