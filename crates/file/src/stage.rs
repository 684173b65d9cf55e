//! Optional transforms applied on the upload path.
//!
//! Chunks pass through a [`ChunkSealer`] (plain or encrypting), sibling
//! groups through the parity encoder, and the finished root reference through
//! the [`AccessStage`]. Each is chosen from one option flag and can be tested
//! on its own.

use std::{fmt, sync::Arc};

use vertex_swarm_act::{AccessController, AccessGrant, Putter};
use vertex_swarm_primitives::{
    ChunkAddress, ContentChunk, ENCRYPTED_REFERENCE_SIZE, EncryptionKey, HASH_SIZE, Reference,
};
use vertex_swarm_redundancy::ParityEncoder;
use vertex_swarm_storer::ChunkStore;

use crate::{
    error::{FileError, FileResult},
    options::UploadOptions,
};

/// A chunk ready to store and the reference its parent records for it.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub chunk: ContentChunk,
    pub reference: Reference,
}

/// Turns an addressed chunk into the form that is stored.
pub trait ChunkSealer: Send + Sync + fmt::Debug {
    /// Size of the references this sealer produces.
    fn reference_size(&self) -> usize;

    fn seal(&self, chunk: ContentChunk) -> FileResult<Sealed>;
}

/// Stores chunks as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSealer;

impl ChunkSealer for PlainSealer {
    fn reference_size(&self) -> usize {
        HASH_SIZE
    }

    fn seal(&self, chunk: ContentChunk) -> FileResult<Sealed> {
        let reference = Reference::plain(chunk.address());
        Ok(Sealed { chunk, reference })
    }
}

/// Encrypts each chunk under a fresh random key carried in its reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptingSealer;

impl ChunkSealer for EncryptingSealer {
    fn reference_size(&self) -> usize {
        ENCRYPTED_REFERENCE_SIZE
    }

    fn seal(&self, chunk: ContentChunk) -> FileResult<Sealed> {
        let key = EncryptionKey::random();
        let chunk = key.transform_chunk(&chunk)?;
        let reference = Reference::encrypted(chunk.address(), key);
        Ok(Sealed { chunk, reference })
    }
}

/// Wraps the root reference through an [`AccessController`].
#[derive(Clone)]
pub struct AccessStage {
    controller: Arc<dyn AccessController>,
    history: Option<ChunkAddress>,
}

impl AccessStage {
    pub fn new(controller: Arc<dyn AccessController>, history: Option<ChunkAddress>) -> Self {
        Self {
            controller,
            history,
        }
    }

    /// Grant access to `reference`, storing the history entry through
    /// `putter`.
    pub async fn apply(
        &self,
        putter: &dyn Putter,
        getter: &dyn ChunkStore,
        reference: &Reference,
    ) -> FileResult<AccessGrant> {
        Ok(self
            .controller
            .encrypt(putter, getter, reference, self.history.as_ref())
            .await?)
    }
}

impl fmt::Debug for AccessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessStage")
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

/// The transforms enabled for one upload, in application order.
#[derive(Debug)]
pub struct Stages {
    pub sealer: Box<dyn ChunkSealer>,
    pub parity: ParityEncoder,
    pub access: Option<AccessStage>,
}

impl Stages {
    /// Select stages from `options`. Access control needs a configured
    /// controller.
    pub fn from_options(
        options: &UploadOptions,
        controller: Option<Arc<dyn AccessController>>,
    ) -> FileResult<Self> {
        let sealer: Box<dyn ChunkSealer> = if options.encrypt {
            Box::new(EncryptingSealer)
        } else {
            Box::new(PlainSealer)
        };

        let access = match (options.access_control, controller) {
            (false, _) => None,
            (true, Some(controller)) => Some(AccessStage::new(controller, options.history_address)),
            (true, None) => {
                return Err(FileError::validation(
                    "access control requested but no controller is configured",
                ));
            }
        };

        Ok(Self {
            sealer,
            parity: ParityEncoder::new(options.redundancy),
            access,
        })
    }
}
