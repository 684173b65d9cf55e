//! In-memory chunk store.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use vertex_swarm_postage::{PostageStamp, StampedChunk};
use vertex_swarm_primitives::ChunkAddress;

use crate::{ChunkStore, StorerError, StorerResult};

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    stamp: Option<PostageStamp>,
}

/// Chunk store backed by a `HashMap`, for tests and development nodes.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<ChunkAddress, Entry>>,
}

impl MemoryChunkStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under an address without stamping or verification.
    pub fn insert_raw(&self, address: ChunkAddress, data: Bytes) {
        self.chunks
            .write()
            .insert(address, Entry { data, stamp: None });
    }

    /// Drop a chunk, as happens when it is garbage collected or lost.
    pub fn remove(&self, address: &ChunkAddress) -> bool {
        self.chunks.write().remove(address).is_some()
    }

    /// Stamp stored with a chunk, if any.
    pub fn stamp(&self, address: &ChunkAddress) -> Option<PostageStamp> {
        self.chunks.read().get(address).and_then(|e| e.stamp.clone())
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Addresses of all stored chunks.
    pub fn addresses(&self) -> Vec<ChunkAddress> {
        self.chunks.read().keys().copied().collect()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put(&self, chunk: &StampedChunk) -> StorerResult<bool> {
        let mut chunks = self.chunks.write();
        if chunks.contains_key(&chunk.address()) {
            return Ok(true);
        }
        chunks.insert(
            chunk.address(),
            Entry {
                data: chunk.chunk().to_bytes(),
                stamp: Some(chunk.stamp().clone()),
            },
        );
        Ok(false)
    }

    async fn get(&self, address: &ChunkAddress) -> StorerResult<Bytes> {
        self.chunks
            .read()
            .get(address)
            .map(|e| e.data.clone())
            .ok_or(StorerError::NotFound(*address))
    }

    async fn has(&self, address: &ChunkAddress) -> StorerResult<bool> {
        Ok(self.chunks.read().contains_key(address))
    }
}
