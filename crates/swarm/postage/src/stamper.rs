//! Stamping chunks for one upload.

use std::sync::Arc;

use tracing::debug;
use vertex_swarm_primitives::ContentChunk;

use crate::{
    BatchId, CredentialLedger, StampedChunk,
    error::{PostageError, PostageResult},
};

/// Attaches stamps from a single batch to chunks.
///
/// Cheap to clone and safe to use from concurrent tasks; capacity accounting
/// lives in the shared [`CredentialLedger`].
#[derive(Clone)]
pub struct Stamper {
    ledger: Arc<dyn CredentialLedger>,
    batch_id: BatchId,
}

impl Stamper {
    /// Create a stamper after checking that the batch exists and is usable.
    pub async fn for_batch(
        ledger: Arc<dyn CredentialLedger>,
        batch_id: BatchId,
    ) -> PostageResult<Self> {
        let batch = ledger.batch(&batch_id).await?;
        if !batch.usable() {
            debug!(batch = %batch_id, "batch not usable");
            return Err(PostageError::BatchUnusable(batch_id));
        }
        Ok(Self { ledger, batch_id })
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    /// Request a stamp for `chunk`.
    pub async fn stamp(&self, chunk: ContentChunk) -> PostageResult<StampedChunk> {
        let stamp = self.ledger.issue(&self.batch_id, &chunk.address()).await?;
        Ok(StampedChunk::new(chunk, stamp))
    }
}

impl std::fmt::Debug for Stamper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stamper")
            .field("batch_id", &self.batch_id)
            .finish_non_exhaustive()
    }
}
