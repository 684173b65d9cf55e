use thiserror::Error;

/// Errors raised while building, parsing or verifying chunks.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Size error: {context} (size: {size}, limit: {limit})")]
    Size {
        context: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Invalid chunk format: {0}")]
    Format(&'static str),

    #[error("Verification failed: {context} (expected: {expected}, got: {got})")]
    Verification {
        context: &'static str,
        expected: String,
        got: String,
    },

    #[error("Invalid hex: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),
}

/// Result alias for chunk operations.
pub type Result<T> = std::result::Result<T, ChunkError>;

impl ChunkError {
    pub fn size(context: &'static str, size: usize, limit: usize) -> Self {
        Self::Size {
            context,
            size,
            limit,
        }
    }

    pub fn format(msg: &'static str) -> Self {
        Self::Format(msg)
    }

    pub fn verification<T: std::fmt::Display>(context: &'static str, expected: T, got: T) -> Self {
        Self::Verification {
            context,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}
