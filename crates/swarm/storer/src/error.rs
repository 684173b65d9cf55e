//! Storer error types.

use vertex_swarm_primitives::ChunkAddress;

/// Errors from storer operations.
#[derive(Debug, thiserror::Error)]
pub enum StorerError {
    /// Chunk not found.
    #[error("chunk not found: {0}")]
    NotFound(ChunkAddress),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Blocking task failed to complete.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// redb reports each failure stage with its own error type; all of them mean
/// the database is unusable for this call.
macro_rules! database_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for StorerError {
                fn from(err: $ty) -> Self {
                    StorerError::Database(err.to_string())
                }
            }
        )+
    };
}

database_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Result type for storer operations.
pub type StorerResult<T> = Result<T, StorerError>;
