//! redb-based chunk storage backend.
//!
//! This module provides [`RedbChunkStore`], a persistent chunk store
//! backed by the redb embedded database. Chunk bytes and stamps live in
//! separate tables keyed by address; database work runs on the blocking
//! thread pool.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::debug;
use vertex_swarm_postage::{PostageStamp, StampedChunk};
use vertex_swarm_primitives::ChunkAddress;

use crate::{ChunkStore, StorerError, StorerResult};

/// Table definition for chunks.
/// Key: 32-byte chunk address
/// Value: span followed by payload
const CHUNKS_TABLE: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("chunks");

/// Table definition for stamps.
/// Key: 32-byte chunk address
/// Value: encoded postage stamp
const STAMPS_TABLE: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("stamps");

/// redb-based chunk store.
///
/// Cheap to clone; clones share the database handle.
#[derive(Clone)]
pub struct RedbChunkStore {
    db: Arc<Database>,
}

impl RedbChunkStore {
    /// Open or create a chunk store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorerResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CHUNKS_TABLE)?;
            let _ = write_txn.open_table(STAMPS_TABLE)?;
        }
        write_txn.commit()?;

        debug!("Opened redb chunk store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Stamp stored with a chunk.
    pub async fn stamp(&self, address: &ChunkAddress) -> StorerResult<Option<PostageStamp>> {
        let db = Arc::clone(&self.db);
        let key = *address.as_bytes();
        tokio::task::spawn_blocking(move || -> StorerResult<Option<PostageStamp>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(STAMPS_TABLE)?;
            let Some(value) = table.get(&key)? else {
                return Ok(None);
            };
            PostageStamp::try_from(value.value())
                .map(Some)
                .map_err(|e| StorerError::Database(e.to_string()))
        })
        .await?
    }

    /// Get the count of stored chunks.
    pub fn count(&self) -> StorerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHUNKS_TABLE)?;
        Ok(table.len()?)
    }
}

#[async_trait]
impl ChunkStore for RedbChunkStore {
    async fn put(&self, chunk: &StampedChunk) -> StorerResult<bool> {
        let db = Arc::clone(&self.db);
        let key = *chunk.address().as_bytes();
        let data = chunk.chunk().to_bytes();
        let stamp = chunk.stamp().to_bytes();

        let existed = tokio::task::spawn_blocking(move || -> StorerResult<bool> {
            let write_txn = db.begin_write()?;
            let existed = {
                let mut chunks = write_txn.open_table(CHUNKS_TABLE)?;
                let existed = chunks.get(&key)?.is_some();
                if !existed {
                    chunks.insert(&key, data.as_ref())?;
                    let mut stamps = write_txn.open_table(STAMPS_TABLE)?;
                    stamps.insert(&key, stamp.as_ref())?;
                }
                existed
            };
            write_txn.commit()?;
            Ok(existed)
        })
        .await??;

        if !existed {
            counter!("storer_chunks_stored_total").increment(1);
        }
        Ok(existed)
    }

    async fn get(&self, address: &ChunkAddress) -> StorerResult<Bytes> {
        let db = Arc::clone(&self.db);
        let address = *address;
        tokio::task::spawn_blocking(move || -> StorerResult<Bytes> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CHUNKS_TABLE)?;
            match table.get(address.as_bytes())? {
                Some(value) => Ok(Bytes::copy_from_slice(value.value())),
                None => Err(StorerError::NotFound(address)),
            }
        })
        .await?
    }

    async fn has(&self, address: &ChunkAddress) -> StorerResult<bool> {
        let db = Arc::clone(&self.db);
        let key = *address.as_bytes();
        tokio::task::spawn_blocking(move || -> StorerResult<bool> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CHUNKS_TABLE)?;
            Ok(table.get(&key)?.is_some())
        })
        .await?
    }
}
