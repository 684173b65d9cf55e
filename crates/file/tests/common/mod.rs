#![allow(dead_code, unreachable_pub)]

use std::sync::Arc;

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use bytes::Bytes;
use futures::TryStreamExt;
use vertex_file::{Context, Downloader, FileResult, UploadOptions, UploadResult, Uploader};
use vertex_swarm_act::{AccessController, GrantKey, HistoryController};
use vertex_swarm_postage::{Batch, BatchId, BatchLedger};
use vertex_swarm_primitives::{ChunkAddress, Reference};
use vertex_swarm_storer::{MemoryChunkStore, PinStore};
use vertex_swarm_tags::SessionTracker;

pub const MIB: usize = 1024 * 1024;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("vertex_file=debug")
        .with_test_writer()
        .try_init();
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len as u64)
        .map(|i| (i.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 56) as u8)
        .collect()
}

/// In-memory collaborators around one usable batch.
pub struct Harness {
    pub store: Arc<MemoryChunkStore>,
    pub ledger: Arc<BatchLedger>,
    pub tags: Arc<SessionTracker>,
    pub pins: PinStore,
    pub batch_id: BatchId,
    pub uploader: Uploader,
    pub downloader: Downloader,
}

impl Harness {
    /// A harness whose batch has plenty of room.
    pub fn new() -> Self {
        Self::with_batch(30, 16)
    }

    pub fn with_batch(depth: u8, bucket_depth: u8) -> Self {
        init_tracing();

        let signer = PrivateKeySigner::random();
        let batch_id = B256::repeat_byte(0xb1);
        let batch = Batch::builder()
            .id(batch_id)
            .owner(signer.address())
            .depths(depth, bucket_depth)
            .usable(true)
            .build()
            .unwrap();
        let ledger = Arc::new(BatchLedger::new());
        ledger.insert(batch, signer).unwrap();

        let store = Arc::new(MemoryChunkStore::new());
        let tags = Arc::new(SessionTracker::new());
        let pins = PinStore::new();
        let access: Arc<dyn AccessController> =
            Arc::new(HistoryController::new(GrantKey::new([0x5a; 32]).unwrap()));

        let uploader = Uploader::new(store.clone(), ledger.clone(), tags.clone(), pins.clone())
            .with_access_controller(access.clone())
            .with_concurrency(8);
        let downloader = Downloader::new(store.clone()).with_access_controller(access);

        Self {
            store,
            ledger,
            tags,
            pins,
            batch_id,
            uploader,
            downloader,
        }
    }

    pub fn options(&self) -> UploadOptions {
        UploadOptions::new(self.batch_id)
    }

    pub async fn upload(&self, data: &[u8], options: &UploadOptions) -> FileResult<UploadResult> {
        self.uploader
            .upload(&Context::background(), data, options)
            .await
    }

    pub async fn download(
        &self,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> FileResult<Vec<u8>> {
        let ctx = Context::background();
        let parts: Vec<Bytes> = self
            .downloader
            .download(&ctx, reference, history)
            .await?
            .try_collect()
            .await?;
        Ok(parts.concat())
    }

    pub async fn length(&self, reference: &Reference) -> FileResult<u64> {
        self.downloader
            .length(&Context::background(), reference, None)
            .await
    }
}
