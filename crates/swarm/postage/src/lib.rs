//! Postage for Swarm uploads.
//!
//! Every stored chunk carries a [`PostageStamp`] issued from a [`Batch`]. A
//! batch has a fixed number of buckets and each bucket a fixed number of
//! slots; the [`CredentialLedger`] hands out slots atomically and refuses once
//! a bucket is full.
//!
//! - [`Batch`] / [`BatchBuilder`] - batch parameters and capacity
//! - [`PostageStamp`] - signed stamp and its 113-byte encoding
//! - [`StampIssuer`] - lock-free per-bucket counters
//! - [`CredentialLedger`] / [`BatchLedger`] - stamp source
//! - [`Stamper`] - per-upload stamping front-end

mod batch;
mod error;
mod issuer;
mod ledger;
mod stamp;
mod stamper;

pub use batch::{
    Batch, BatchBuilder, BatchId, MAX_BUCKET_DEPTH, MAX_DEPTH, pack_index, to_bucket_index,
    unpack_index,
};
pub use error::{PostageError, PostageResult};
pub use issuer::StampIssuer;
pub use ledger::{BatchLedger, CredentialLedger};
pub use stamp::{POSTAGE_STAMP_SIZE, PostageStamp, StampedChunk};
pub use stamper::Stamper;
