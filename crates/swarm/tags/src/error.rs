//! Tag error types.

use crate::TagField;

/// Errors from session tracking.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// No session with this id exists.
    #[error("tag not found: {0}")]
    NotFound(u64),

    /// An increment would break the ordering between counters.
    #[error("{field} would exceed {bound} ({value} + {delta} > {limit})")]
    Bound {
        field: TagField,
        bound: TagField,
        value: u64,
        delta: u64,
        limit: u64,
    },
}

/// Result alias for tag operations.
pub type TagResult<T> = std::result::Result<T, TagError>;
