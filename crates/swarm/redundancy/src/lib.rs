//! Erasure coding for Swarm hash trees.
//!
//! Sibling chunks under one intermediate chunk form a group. At a redundancy
//! level above [`RedundancyLevel::None`](vertex_swarm_primitives::RedundancyLevel)
//! the group is extended with Reed-Solomon parity chunks whose references are
//! appended to the parent. A reader that cannot fetch some data chunks
//! rebuilds them with [`recover`] as long as enough chunks of the group
//! remain.

mod decoder;
mod encoder;
mod error;
mod table;

pub use decoder::recover;
pub use encoder::{ParityEncoder, SHARD_SIZE};
pub use error::{RedundancyError, RedundancyResult};
pub use table::{max_shards, parities};
