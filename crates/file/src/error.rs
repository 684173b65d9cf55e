//! File pipeline error types.

use strum::{Display, IntoStaticStr};
use vertex_swarm_act::ActError;
use vertex_swarm_postage::PostageError;
use vertex_swarm_primitives::ChunkError;
use vertex_swarm_redundancy::RedundancyError;
use vertex_swarm_storer::StorerError;
use vertex_swarm_tags::TagError;

/// Coarse classification of a [`FileError`].
///
/// Callers branch on the kind rather than on the concrete variant: a
/// [`Capacity`](ErrorKind::Capacity) failure is retried after a top-up while
/// [`Internal`](ErrorKind::Internal) points at corrupt data or a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed options, rejected before anything is stored.
    Validation,
    /// A session, batch, chunk or history entry is absent.
    NotFound,
    /// A postage bucket is full.
    Capacity,
    /// Bad grant key or history layout.
    AccessControl,
    /// Store, fetch or input stream failure.
    Transport,
    /// The operation's context was cancelled or its deadline passed.
    Cancelled,
    /// An invariant was violated, e.g. a chunk does not match its address.
    Internal,
}

/// Errors from the upload and download paths.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("invalid upload options: {0}")]
    Validation(String),

    #[error(transparent)]
    Postage(#[from] PostageError),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Store(#[from] StorerError),

    #[error(transparent)]
    Redundancy(#[from] RedundancyError),

    #[error("access control: {0}")]
    Act(ActError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error("reading input failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl FileError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Postage(err) => match err {
                PostageError::BatchNotFound(_) => ErrorKind::NotFound,
                PostageError::CapacityExhausted { .. } => ErrorKind::Capacity,
                PostageError::BatchUnusable(_) => ErrorKind::Validation,
                _ => ErrorKind::Internal,
            },
            Self::Tag(err) => match err {
                TagError::NotFound(_) => ErrorKind::NotFound,
                TagError::Bound { .. } => ErrorKind::Internal,
            },
            Self::Store(err) => store_kind(err),
            Self::Redundancy(err) => match err {
                RedundancyError::Unrecoverable { .. } => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
            Self::Act(err) => match err {
                ActError::HistoryNotFound(_) => ErrorKind::NotFound,
                ActError::InvalidGrantKey(_)
                | ActError::MalformedHistory(_)
                | ActError::EntryNotFound => ErrorKind::AccessControl,
                ActError::Store(err) => store_kind(err),
                ActError::Put(_) => ErrorKind::Transport,
                ActError::Chunk(_) => ErrorKind::Internal,
            },
            Self::Chunk(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Io(_) => ErrorKind::Transport,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

fn store_kind(err: &StorerError) -> ErrorKind {
    if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Transport
    }
}

impl From<ActError> for FileError {
    /// Errors raised by the upload session while storing history chunks come
    /// back boxed; unwrap them so their kind survives the round trip.
    fn from(err: ActError) -> Self {
        match err {
            ActError::Put(inner) => match inner.downcast::<FileError>() {
                Ok(file) => *file,
                Err(other) => Self::Act(ActError::Put(other)),
            },
            other => Self::Act(other),
        }
    }
}

/// Result alias for file operations.
pub type FileResult<T> = std::result::Result<T, FileError>;
