//! Credential ledgers: the source of postage stamps.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use dashmap::DashMap;
use metrics::counter;
use tracing::{debug, trace};
use vertex_swarm_primitives::ChunkAddress;

use crate::{
    Batch, BatchId, PostageStamp, StampIssuer,
    error::{PostageError, PostageResult},
};

/// Issues capacity-bounded stamps from postage batches.
///
/// Implementations must make bucket accounting atomic across every caller in
/// the process, not only within one upload.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait CredentialLedger: Send + Sync {
    /// Look up a batch.
    ///
    /// Fails with [`PostageError::BatchNotFound`] for unknown ids.
    async fn batch(&self, batch_id: &BatchId) -> PostageResult<Batch>;

    /// Issue one stamp for the chunk at `address`.
    ///
    /// The bucket is derived from the address. Fails with
    /// [`PostageError::CapacityExhausted`] when that bucket is full,
    /// [`PostageError::BatchUnusable`] when the batch is not yet active and
    /// [`PostageError::BatchNotFound`] for unknown ids.
    async fn issue(&self, batch_id: &BatchId, address: &ChunkAddress)
    -> PostageResult<PostageStamp>;
}

struct LedgerEntry {
    issuer: StampIssuer,
    signer: PrivateKeySigner,
    usable: AtomicBool,
}

/// In-memory ledger holding batches together with their owner keys.
#[derive(Default)]
pub struct BatchLedger {
    batches: DashMap<BatchId, Arc<LedgerEntry>>,
}

impl BatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch and the key that signs for it.
    pub fn insert(&self, batch: Batch, signer: PrivateKeySigner) -> PostageResult<()> {
        if signer.address() != batch.owner() {
            return Err(PostageError::OwnerMismatch);
        }
        debug!(batch = %batch.id(), depth = batch.depth(), bucket_depth = batch.bucket_depth(), "registered batch");
        let entry = LedgerEntry {
            usable: AtomicBool::new(batch.usable()),
            issuer: StampIssuer::new(batch.clone()),
            signer,
        };
        self.batches.insert(*batch.id(), Arc::new(entry));
        Ok(())
    }

    /// Mark a batch usable for stamping.
    pub fn activate(&self, batch_id: &BatchId) -> PostageResult<()> {
        self.entry(batch_id)?.usable.store(true, Ordering::Release);
        Ok(())
    }

    /// Stamps issued so far from one bucket.
    pub fn bucket_count(&self, batch_id: &BatchId, bucket: u32) -> PostageResult<u32> {
        Ok(self.entry(batch_id)?.issuer.bucket_count(bucket))
    }

    /// Stamps issued so far from a batch.
    pub fn issued(&self, batch_id: &BatchId) -> PostageResult<u64> {
        Ok(self.entry(batch_id)?.issuer.issued())
    }

    fn entry(&self, batch_id: &BatchId) -> PostageResult<Arc<LedgerEntry>> {
        self.batches
            .get(batch_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PostageError::BatchNotFound(*batch_id))
    }
}

#[async_trait]
impl CredentialLedger for BatchLedger {
    async fn batch(&self, batch_id: &BatchId) -> PostageResult<Batch> {
        let entry = self.entry(batch_id)?;
        let mut batch = entry.issuer.batch().clone();
        batch.set_usable(entry.usable.load(Ordering::Acquire));
        Ok(batch)
    }

    async fn issue(
        &self,
        batch_id: &BatchId,
        address: &ChunkAddress,
    ) -> PostageResult<PostageStamp> {
        let entry = self.entry(batch_id)?;
        if !entry.usable.load(Ordering::Acquire) {
            return Err(PostageError::BatchUnusable(*batch_id));
        }

        let (bucket, slot) = entry.issuer.increment(address).inspect_err(|err| {
            if err.is_capacity() {
                counter!("postage_bucket_full_total").increment(1);
                debug!(batch = %batch_id, %address, "bucket full");
            }
        })?;

        let stamp = PostageStamp::sign(
            &entry.signer,
            address,
            *batch_id,
            bucket,
            slot,
            unix_nanos(),
        )?;

        counter!("postage_stamps_issued_total").increment(1);
        trace!(batch = %batch_id, %address, bucket, slot, "issued stamp");
        Ok(stamp)
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
