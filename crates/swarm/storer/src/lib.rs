//! Chunk persistence for stamped Swarm chunks.
//!
//! - [`ChunkStore`] - async put/get interface used by the upload and download
//!   paths
//! - [`MemoryChunkStore`] - in-memory backend
//! - [`RedbChunkStore`] - persistent backend on redb
//! - [`PinStore`] / [`PinCollection`] - staged pinning of uploads

mod error;
mod memory;
mod pin;
mod redb_store;
mod traits;

pub use error::{StorerError, StorerResult};
pub use memory::MemoryChunkStore;
pub use pin::{PinCollection, PinStore};
pub use redb_store::RedbChunkStore;
pub use traits::ChunkStore;
