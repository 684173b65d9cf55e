//! Chunk storage backend trait.
//!
//! The [`ChunkStore`] trait abstracts over storage backends so the upload
//! and download paths work against redb, memory, or a network-backed putter
//! alike.

use async_trait::async_trait;
use bytes::Bytes;
use vertex_swarm_postage::StampedChunk;
use vertex_swarm_primitives::ChunkAddress;

use crate::StorerResult;

/// Chunk storage backend.
///
/// # Chunk Data Format
///
/// [`get`](ChunkStore::get) returns the chunk's wire bytes: span followed by
/// payload. Callers re-derive and check the address; the store does not.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait ChunkStore: Send + Sync {
    /// Persist a stamped chunk.
    ///
    /// Idempotent. Returns `true` if the chunk was already present.
    async fn put(&self, chunk: &StampedChunk) -> StorerResult<bool>;

    /// Fetch a chunk's wire bytes, failing with
    /// [`StorerError::NotFound`](crate::StorerError::NotFound) on a miss.
    async fn get(&self, address: &ChunkAddress) -> StorerResult<Bytes>;

    /// Check if a chunk exists.
    async fn has(&self, address: &ChunkAddress) -> StorerResult<bool>;
}
