//! Parity generation for a group of sibling chunks.

use bytes::Bytes;
use reed_solomon_erasure::galois_8::ReedSolomon;
use tracing::trace;
use vertex_swarm_primitives::{ContentChunk, MAX_CHUNK_SIZE, RedundancyLevel};

use crate::{
    error::{RedundancyError, RedundancyResult},
    table::parities,
};

/// Size of one shard: a chunk's span and payload, zero-padded.
pub const SHARD_SIZE: usize = MAX_CHUNK_SIZE;

/// Pad a chunk's wire bytes to a full shard.
pub(crate) fn to_shard(chunk_bytes: &[u8]) -> Vec<u8> {
    let mut shard = vec![0u8; SHARD_SIZE];
    let len = chunk_bytes.len().min(SHARD_SIZE);
    shard[..len].copy_from_slice(&chunk_bytes[..len]);
    shard
}

/// Derives parity chunks for data groups at a fixed redundancy level.
#[derive(Debug, Clone, Copy)]
pub struct ParityEncoder {
    level: RedundancyLevel,
}

impl ParityEncoder {
    pub fn new(level: RedundancyLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> RedundancyLevel {
        self.level
    }

    /// Number of parity chunks [`encode`](Self::encode) yields for `shards`
    /// data chunks.
    pub fn parities(&self, shards: usize) -> usize {
        parities(self.level, shards)
    }

    /// Compute parity chunks for `group`.
    ///
    /// Each parity shard becomes a chunk whose first eight bytes act as its
    /// span. Returns an empty list at [`RedundancyLevel::None`].
    pub fn encode(&self, group: &[ContentChunk]) -> RedundancyResult<Vec<ContentChunk>> {
        let data = group.len();
        let parity = self.parities(data);
        if parity == 0 || data == 0 {
            return Ok(Vec::new());
        }
        if data + parity > 256 {
            return Err(RedundancyError::GroupSize {
                size: data,
                max: 256 - parity,
            });
        }

        let mut shards: Vec<Vec<u8>> = group
            .iter()
            .map(|chunk| to_shard(&chunk.to_bytes()))
            .chain(std::iter::repeat_with(|| vec![0u8; SHARD_SIZE]).take(parity))
            .collect();

        let rs = ReedSolomon::new(data, parity)?;
        rs.encode(&mut shards)?;

        trace!(level = %self.level, data, parity, "encoded parity group");

        shards
            .into_iter()
            .skip(data)
            .map(|shard| ContentChunk::try_from(Bytes::from(shard)).map_err(RedundancyError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: usize) -> Vec<ContentChunk> {
        (0..n)
            .map(|i| ContentChunk::new(vec![i as u8; 100 + i]).unwrap())
            .collect()
    }

    #[test]
    fn test_no_parity_without_level() {
        let encoder = ParityEncoder::new(RedundancyLevel::None);
        assert!(encoder.encode(&group(10)).unwrap().is_empty());
    }

    #[test]
    fn test_parity_count_follows_table() {
        let encoder = ParityEncoder::new(RedundancyLevel::Medium);
        let parity = encoder.encode(&group(10)).unwrap();
        assert_eq!(parity.len(), 4);
        assert_eq!(parity.len(), parities(RedundancyLevel::Medium, 10));
        assert!(parity.iter().all(|c| c.payload().len() == 4096));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = ParityEncoder::new(RedundancyLevel::Strong);
        let a = encoder.encode(&group(7)).unwrap();
        let b = encoder.encode(&group(7)).unwrap();
        let addresses = |v: &[ContentChunk]| v.iter().map(|c| c.address()).collect::<Vec<_>>();
        assert_eq!(addresses(&a), addresses(&b));
    }
}
