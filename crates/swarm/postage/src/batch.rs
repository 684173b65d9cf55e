//! Postage batches.
//!
//! A batch grants `2^depth` stamps split evenly over `2^bucket_depth`
//! buckets. A chunk's bucket is fixed by the top bits of its address, so each
//! bucket admits at most `2^(depth - bucket_depth)` chunks.

use alloy_primitives::{Address, B256};

use crate::error::{PostageError, PostageResult};

/// Identifier of a postage batch.
pub type BatchId = B256;

/// Largest supported bucket depth.
pub const MAX_BUCKET_DEPTH: u8 = 16;

/// Largest supported batch depth.
pub const MAX_DEPTH: u8 = 64;

/// A postage batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    owner: Address,
    value: u128,
    depth: u8,
    bucket_depth: u8,
    immutable: bool,
    usable: bool,
}

impl Batch {
    pub fn builder() -> BatchBuilder {
        BatchBuilder::default()
    }

    pub fn id(&self) -> &BatchId {
        &self.id
    }

    /// The address that signs stamps for this batch.
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn bucket_depth(&self) -> u8 {
        self.bucket_depth
    }

    pub fn immutable(&self) -> bool {
        self.immutable
    }

    /// Whether the batch has been activated for stamping.
    pub fn usable(&self) -> bool {
        self.usable
    }

    /// Number of buckets.
    pub fn buckets(&self) -> u32 {
        1u32 << self.bucket_depth
    }

    /// Maximum number of stamps per bucket.
    pub fn max_collisions(&self) -> u64 {
        // Slots are u32 on the wire.
        let shift = u32::from(self.depth - self.bucket_depth).min(32);
        1u64 << shift
    }

    pub(crate) fn set_usable(&mut self, usable: bool) {
        self.usable = usable;
    }
}

/// Builder for [`Batch`].
#[derive(Debug, Default)]
pub struct BatchBuilder {
    id: Option<BatchId>,
    owner: Option<Address>,
    value: u128,
    depth: Option<u8>,
    bucket_depth: u8,
    immutable: bool,
    usable: bool,
}

impl BatchBuilder {
    pub fn id(mut self, id: BatchId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    pub fn depths(mut self, depth: u8, bucket_depth: u8) -> Self {
        self.depth = Some(depth);
        self.bucket_depth = bucket_depth;
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    pub fn usable(mut self, usable: bool) -> Self {
        self.usable = usable;
        self
    }

    pub fn build(self) -> PostageResult<Batch> {
        let id = self.id.ok_or(PostageError::MissingField("id"))?;
        let owner = self.owner.ok_or(PostageError::MissingField("owner"))?;
        let depth = self.depth.ok_or(PostageError::MissingField("depth"))?;
        let bucket_depth = self.bucket_depth;

        if bucket_depth == 0
            || bucket_depth > MAX_BUCKET_DEPTH
            || depth < bucket_depth
            || depth > MAX_DEPTH
        {
            return Err(PostageError::InvalidDepth {
                depth,
                bucket_depth,
            });
        }

        Ok(Batch {
            id,
            owner,
            value: self.value,
            depth,
            bucket_depth,
            immutable: self.immutable,
            usable: self.usable,
        })
    }
}

/// Bucket of a chunk address: the top `bucket_depth` bits.
pub fn to_bucket_index(bucket_depth: u8, prefix: u32) -> u32 {
    match bucket_depth {
        0 => 0,
        d if d >= 32 => prefix,
        d => prefix >> (32 - u32::from(d)),
    }
}

/// Packs a bucket index and a slot index into a single u64 value.
pub fn pack_index(bucket: u32, slot: u32) -> u64 {
    (u64::from(bucket) << 32) | u64::from(slot)
}

/// Unpacks a u64 value into a bucket index and a slot index.
pub fn unpack_index(index: u64) -> (u32, u32) {
    ((index >> 32) as u32, index as u32)
}
