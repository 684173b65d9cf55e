//! Access control error types.

use vertex_swarm_primitives::{ChunkAddress, ChunkError};
use vertex_swarm_storer::StorerError;

/// Boxed error returned by a [`Putter`](crate::Putter).
pub type PutError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from access control.
#[derive(Debug, thiserror::Error)]
pub enum ActError {
    /// The history address given to extend does not resolve.
    #[error("history not found: {0}")]
    HistoryNotFound(ChunkAddress),

    /// Grant key material is malformed.
    #[error("invalid grant key: {0}")]
    InvalidGrantKey(&'static str),

    /// A history chunk does not have the expected layout.
    #[error("malformed history: {0}")]
    MalformedHistory(&'static str),

    /// No entry in the history chain holds the encrypted reference.
    #[error("no history entry for reference")]
    EntryNotFound,

    /// Storing a history chunk failed.
    #[error("storing history failed: {0}")]
    Put(PutError),

    /// Reading a history chunk failed.
    #[error("reading history failed: {0}")]
    Store(#[from] StorerError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// Result alias for access control operations.
pub type ActResult<T> = std::result::Result<T, ActError>;
