//! Primitive types for Swarm content: chunk addresses, the BMT hash, spans,
//! chunk encryption and references.
//!
//! Everything here is synchronous and allocation-light; the upload and
//! download paths in `vertex-file` build on these types.

mod address;
mod bmt;
mod chunk;
mod constants;
mod encryption;
mod error;
mod level;
mod reference;
mod span;

pub use address::ChunkAddress;
pub use bmt::BmtHasher;
pub use chunk::ContentChunk;
pub use constants::*;
pub use encryption::EncryptionKey;
pub use error::{ChunkError, Result as ChunkResult};
pub use level::RedundancyLevel;
pub use reference::Reference;
pub use span::Span;
