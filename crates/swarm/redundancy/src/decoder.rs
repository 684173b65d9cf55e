//! Recovery of missing chunks from a parity group.

use bytes::Bytes;
use metrics::counter;
use reed_solomon_erasure::galois_8::ReedSolomon;
use tracing::debug;

use crate::{
    encoder::to_shard,
    error::{RedundancyError, RedundancyResult},
};

/// Rebuild every data shard of a group.
///
/// `data` and `parity` hold the wire bytes of each chunk in group order, or
/// `None` where the chunk could not be fetched. On success the returned
/// shards are full-size; the caller trims each to its chunk length and
/// re-verifies its address.
pub fn recover(data: &[Option<Bytes>], parity: &[Option<Bytes>]) -> RedundancyResult<Vec<Bytes>> {
    let required = data.len();
    let available = data.iter().chain(parity).filter(|s| s.is_some()).count();
    if required == 0 || parity.is_empty() || available < required {
        return Err(RedundancyError::Unrecoverable {
            available,
            required,
        });
    }

    let mut shards: Vec<Option<Vec<u8>>> = data
        .iter()
        .chain(parity)
        .map(|s| s.as_deref().map(to_shard))
        .collect();

    let rs = ReedSolomon::new(required, parity.len())?;
    rs.reconstruct_data(&mut shards)?;

    counter!("redundancy_recoveries_total").increment(1);
    debug!(
        data = required,
        parity = parity.len(),
        missing = required + parity.len() - available,
        "recovered parity group"
    );

    shards
        .into_iter()
        .take(required)
        .map(|s| {
            s.map(Bytes::from).ok_or(RedundancyError::Unrecoverable {
                available,
                required,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParityEncoder;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use vertex_swarm_primitives::{ContentChunk, RedundancyLevel};

    fn encoded(n: usize, level: RedundancyLevel) -> (Vec<ContentChunk>, Vec<ContentChunk>) {
        let group: Vec<_> = (0..n)
            .map(|i| ContentChunk::new(vec![(i * 7) as u8; 64 + i * 3]).unwrap())
            .collect();
        let parity = ParityEncoder::new(level).encode(&group).unwrap();
        (group, parity)
    }

    fn bytes_of(chunks: &[ContentChunk]) -> Vec<Option<Bytes>> {
        chunks.iter().map(|c| Some(c.to_bytes())).collect()
    }

    #[test]
    fn test_recover_missing_data() {
        let (group, parity) = encoded(10, RedundancyLevel::Medium);
        let mut data = bytes_of(&group);
        data[2] = None;
        data[7] = None;

        let recovered = recover(&data, &bytes_of(&parity)).unwrap();
        for (chunk, shard) in group.iter().zip(&recovered) {
            let len = chunk.size();
            let rebuilt = ContentChunk::verified(&chunk.address(), shard.slice(..len)).unwrap();
            assert_eq!(&rebuilt, chunk);
        }
    }

    #[test]
    fn test_too_many_missing() {
        let (group, parity) = encoded(4, RedundancyLevel::Medium);
        assert_eq!(parity.len(), 3);

        let mut data = bytes_of(&group);
        let mut par = bytes_of(&parity);
        data[0] = None;
        data[1] = None;
        par[0] = None;
        par[1] = None;

        assert_matches!(
            recover(&data, &par),
            Err(RedundancyError::Unrecoverable { available: 3, required: 4 })
        );
    }

    proptest! {
        #[test]
        fn test_any_loss_within_parity_recovers(n in 1usize..20, seed in any::<u64>()) {
            let (group, parity) = encoded(n, RedundancyLevel::Strong);
            let mut shards: Vec<Option<Bytes>> = bytes_of(&group);
            shards.extend(bytes_of(&parity));

            // Drop exactly `parity.len()` shards chosen from the seed.
            let total = shards.len();
            let mut state = seed;
            for _ in 0..parity.len() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let start = (state >> 33) as usize % total;
                if let Some(slot) = (0..total).map(|o| (start + o) % total).find(|i| shards[*i].is_some()) {
                    shards[slot] = None;
                }
            }

            let (data, par) = shards.split_at(n);
            let recovered = recover(data, par).unwrap();
            for (chunk, shard) in group.iter().zip(&recovered) {
                let bytes = chunk.to_bytes();
                prop_assert_eq!(&shard[..chunk.size()], bytes.as_ref());
            }
        }
    }
}
