//! Redundancy error types.

/// Errors from parity encoding and recovery.
#[derive(Debug, thiserror::Error)]
pub enum RedundancyError {
    /// Too few chunks of a group are available to rebuild it.
    #[error("unrecoverable group: {available} of {required} shards available")]
    Unrecoverable { available: usize, required: usize },

    /// Group size outside what the level supports.
    #[error("invalid group size {size} (max {max})")]
    GroupSize { size: usize, max: usize },

    /// A parity shard did not form a valid chunk.
    #[error("invalid shard: {0}")]
    Shard(#[from] vertex_swarm_primitives::ChunkError),

    /// Failure inside the Reed-Solomon codec.
    #[error("erasure coding error: {0}")]
    Codec(#[from] reed_solomon_erasure::Error),
}

/// Result alias for redundancy operations.
pub type RedundancyResult<T> = std::result::Result<T, RedundancyError>;
