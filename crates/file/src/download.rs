//! Download entry point.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use tracing::{debug, warn};
use vertex_swarm_act::AccessController;
use vertex_swarm_primitives::{ChunkAddress, Reference};
use vertex_swarm_storer::ChunkStore;

use crate::{
    args::PipelineArgs,
    context::Context,
    error::{FileError, FileResult},
    joiner::{Joiner, RootChunk, unverified_root},
};

/// Resolves references to file contents or lengths.
#[derive(Clone)]
pub struct Downloader {
    joiner: Joiner,
    access: Option<Arc<dyn AccessController>>,
}

impl Downloader {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            joiner: Joiner::new(store),
            access: None,
        }
    }

    pub fn with_access_controller(mut self, controller: Arc<dyn AccessController>) -> Self {
        self.access = Some(controller);
        self
    }

    pub fn with_args(mut self, args: &PipelineArgs) -> Self {
        self.joiner = self.joiner.with_concurrency(args.concurrency);
        self
    }

    pub fn joiner(&self) -> &Joiner {
        &self.joiner
    }

    /// Resolve `reference` to its root chunk. With a history address the
    /// reference is first decrypted through the access controller.
    pub async fn resolve(
        &self,
        ctx: &Context,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> FileResult<RootChunk> {
        let reference = match history {
            Some(history) => {
                let controller = self.access.as_ref().ok_or_else(|| {
                    FileError::validation("history address given but no access controller is configured")
                })?;
                let plain = ctx
                    .run(controller.decrypt(self.joiner.store().as_ref(), reference, history))
                    .await?;
                debug!(%history, %plain, "access granted to reference");
                plain
            }
            None => *reference,
        };
        self.joiner.resolve(ctx, &reference).await
    }

    /// Length of the file under `reference`, read from its root chunk alone.
    pub async fn length(
        &self,
        ctx: &Context,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> FileResult<u64> {
        Ok(self.resolve(ctx, reference, history).await?.length())
    }

    /// Stream the file under `reference`.
    ///
    /// A root that fails address verification is corrupt and is rejected
    /// here, even when its length could still be reported.
    pub async fn download(
        &self,
        ctx: &Context,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> FileResult<BoxStream<'static, FileResult<Bytes>>> {
        let root = self.resolve(ctx, reference, history).await?;
        if let RootChunk::Raw(data) = &root {
            warn!(%reference, len = data.len(), "refusing to stream unverified root");
            return Err(unverified_root());
        }
        debug!(%reference, length = root.length(), "download started");
        Ok(self.joiner.stream(ctx, root))
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("joiner", &self.joiner)
            .field("access_control", &self.access.is_some())
            .finish()
    }
}
