//! Streaming upload and download of files over Swarm chunks.
//!
//! An upload reads a byte source in chunk-sized blocks, builds the hash tree
//! bottom-up and stores every chunk with a postage stamp through a
//! two-phase [`PutterSession`]: the session commits the tag and pin once the
//! root exists, and aborts them on any failure. Optional stages encrypt each
//! chunk, add erasure-coded parity per sibling group, and wrap the root
//! reference with access control.
//!
//! A download resolves a reference to its root chunk, reports its length,
//! or streams the file back, recovering missing chunks from parity.
//!
//! ```ignore
//! let uploader = Uploader::new(store.clone(), ledger, tags, pins);
//! let result = uploader
//!     .upload(&Context::background(), &data[..], &UploadOptions::new(batch_id))
//!     .await?;
//! let length = Downloader::new(store)
//!     .length(&Context::background(), &result.reference, None)
//!     .await?;
//! ```

mod args;
mod context;
mod download;
mod error;
mod hashtrie;
mod joiner;
mod options;
mod pipeline;
mod putter;
mod stage;
mod upload;

pub use args::{DEFAULT_CONCURRENCY, PipelineArgs, RedundancyArg};
pub use context::{CancelHandle, Context};
pub use download::Downloader;
pub use error::{ErrorKind, FileError, FileResult};
pub use hashtrie::{HashTrie, child_capacity};
pub use joiner::{Joiner, RootChunk};
pub use options::{UploadOptions, parse_redundancy};
pub use putter::{PutterSession, SessionState};
pub use stage::{AccessStage, ChunkSealer, EncryptingSealer, PlainSealer, Sealed, Stages};
pub use upload::{UploadResult, Uploader};
