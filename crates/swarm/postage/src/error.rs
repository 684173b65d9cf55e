//! Postage error types.

use alloy_primitives::SignatureError;

use crate::BatchId;

/// Errors from batch lookup, stamp issuance and stamp decoding.
#[derive(Debug, thiserror::Error)]
pub enum PostageError {
    /// The batch id does not resolve.
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    /// The batch exists but cannot be used for stamping yet.
    #[error("batch not usable: {0}")]
    BatchUnusable(BatchId),

    /// The bucket for a chunk has no remaining slots.
    #[error("bucket {bucket} of batch {batch} is full")]
    CapacityExhausted { batch: BatchId, bucket: u32 },

    /// Depths out of range.
    #[error("invalid depth {depth} with bucket depth {bucket_depth}")]
    InvalidDepth { depth: u8, bucket_depth: u8 },

    /// A required builder field was not set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Encoded stamp has the wrong length.
    #[error("incorrect stamp size, received {received} bytes, expected {expected} bytes")]
    IncorrectSize { received: usize, expected: usize },

    /// Stamp signature could not be parsed or recovered.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Signing a stamp failed.
    #[error("signer error: {0}")]
    Signer(#[from] alloy_signer::Error),

    /// Recovered signer is not the batch owner.
    #[error("stamp not signed by batch owner")]
    OwnerMismatch,
}

impl PostageError {
    /// Returns true for the bucket-full condition, which callers retry after a
    /// top-up rather than treating as a defect.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

/// Result alias for postage operations.
pub type PostageResult<T> = std::result::Result<T, PostageError>;
