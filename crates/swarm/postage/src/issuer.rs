//! Per-batch bucket counters.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use vertex_swarm_primitives::ChunkAddress;

use crate::{
    Batch,
    batch::to_bucket_index,
    error::{PostageError, PostageResult},
};

/// Tracks how many stamps each bucket of a batch has issued.
///
/// Every bucket has its own atomic counter, so issuance for different
/// buckets never contends and issuance for one bucket is serialized only on
/// that counter.
#[derive(Debug)]
pub struct StampIssuer {
    batch: Batch,
    buckets: Box<[AtomicU32]>,
    issued: AtomicU64,
}

impl StampIssuer {
    pub fn new(batch: Batch) -> Self {
        let buckets = (0..batch.buckets()).map(|_| AtomicU32::new(0)).collect();
        Self {
            batch,
            buckets,
            issued: AtomicU64::new(0),
        }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Reserve the next slot in the bucket of `address`.
    ///
    /// Returns `(bucket, slot)`. A full bucket is left untouched. Counters
    /// saturate at `u32::MAX` even when the batch allows more collisions.
    pub fn increment(&self, address: &ChunkAddress) -> PostageResult<(u32, u32)> {
        let bucket = to_bucket_index(self.batch.bucket_depth(), address.prefix_u32());
        let counter = self
            .buckets
            .get(bucket as usize)
            .ok_or(PostageError::CapacityExhausted {
                batch: *self.batch.id(),
                bucket,
            })?;

        let capacity = self.batch.max_collisions();
        let slot = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                if u64::from(count) < capacity {
                    count.checked_add(1)
                } else {
                    None
                }
            })
            .map_err(|_| PostageError::CapacityExhausted {
                batch: *self.batch.id(),
                bucket,
            })?;

        self.issued.fetch_add(1, Ordering::Relaxed);
        Ok((bucket, slot))
    }

    /// Stamps issued from `bucket` so far.
    pub fn bucket_count(&self, bucket: u32) -> u32 {
        self.buckets
            .get(bucket as usize)
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    /// Total stamps issued from this batch.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

}
