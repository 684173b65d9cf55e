//! Upload entry point.

use std::sync::Arc;

use metrics::counter;
use tokio::io::AsyncRead;
use tracing::{debug, warn};
use vertex_swarm_act::AccessController;
use vertex_swarm_postage::{CredentialLedger, Stamper};
use vertex_swarm_primitives::{ChunkAddress, Reference};
use vertex_swarm_storer::{ChunkStore, PinStore};
use vertex_swarm_tags::SessionTracker;

use crate::{
    args::{DEFAULT_CONCURRENCY, PipelineArgs},
    context::Context,
    error::FileResult,
    hashtrie::HashTrie,
    options::UploadOptions,
    pipeline,
    putter::PutterSession,
    stage::Stages,
};

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Root of the stored hash tree.
    pub reference: Reference,
    /// Access controlled form of `reference`, with access control on.
    pub encrypted_reference: Option<Reference>,
    /// Newest grant history entry, with access control on.
    pub history_address: Option<ChunkAddress>,
    /// Tag that tracked the upload, if any.
    pub tag: Option<u64>,
    /// Bytes read from the source.
    pub size: u64,
}

/// Runs uploads against shared collaborators.
///
/// Cheap to clone; each call to [`upload`](Self::upload) gets its own
/// session.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ChunkStore>,
    ledger: Arc<dyn CredentialLedger>,
    tags: Arc<SessionTracker>,
    pins: PinStore,
    access: Option<Arc<dyn AccessController>>,
    concurrency: usize,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        ledger: Arc<dyn CredentialLedger>,
        tags: Arc<SessionTracker>,
        pins: PinStore,
    ) -> Self {
        Self {
            store,
            ledger,
            tags,
            pins,
            access: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_access_controller(mut self, controller: Arc<dyn AccessController>) -> Self {
        self.access = Some(controller);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_args(self, args: &PipelineArgs) -> Self {
        self.with_concurrency(args.concurrency)
    }

    pub fn tags(&self) -> &Arc<SessionTracker> {
        &self.tags
    }

    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    /// Split, stamp and store everything `reader` yields.
    ///
    /// Nothing is stored when the options are rejected. Any later failure
    /// aborts the session before it is returned: the tag is marked failed
    /// and the staged pin dropped, while chunks already stored stay.
    pub async fn upload<R>(
        &self,
        ctx: &Context,
        reader: R,
        options: &UploadOptions,
    ) -> FileResult<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.run(ctx, reader, options).await.inspect_err(|err| {
            let kind: &'static str = err.kind().into();
            counter!("file_upload_errors_total", "kind" => kind).increment(1);
        })
    }

    async fn run<R>(&self, ctx: &Context, reader: R, options: &UploadOptions) -> FileResult<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        options.validate()?;
        let stages = Stages::from_options(options, self.access.clone())?;

        let stamper = ctx
            .run(Stamper::for_batch(self.ledger.clone(), options.batch_id))
            .await?;

        // Nothing may be created for uploads rejected up to here.
        let tag = if options.tag != 0 {
            Some(self.tags.get(options.tag)?)
        } else if options.tracked() {
            Some(self.tags.create())
        } else {
            None
        };
        let tag_uid = tag.as_ref().map(|t| t.uid());

        debug!(
            batch = %options.batch_id,
            tag = tag_uid,
            encrypt = options.encrypt,
            redundancy = %options.redundancy,
            pin = options.pin,
            deferred = options.deferred,
            "upload started"
        );

        let session = Arc::new(PutterSession::new(
            ctx.clone(),
            self.store.clone(),
            stamper,
            tag,
            options.deferred,
            options.pin.then(|| self.pins.stage()),
        ));

        let Stages {
            sealer,
            parity,
            access,
        } = stages;
        let trie = HashTrie::new(sealer, parity);

        let (reference, size) =
            match pipeline::run(ctx, reader, trie, session.clone(), self.concurrency).await {
                Ok(root) => root,
                Err(err) => {
                    warn!(tag = tag_uid, %err, "upload failed, cleaning up");
                    session.cleanup();
                    return Err(err);
                }
            };

        let grant = match &access {
            Some(stage) => {
                match ctx
                    .run(stage.apply(session.as_ref(), self.store.as_ref(), &reference))
                    .await
                {
                    Ok(grant) => Some(grant),
                    Err(err) => {
                        warn!(%reference, tag = tag_uid, %err, "access control failed, cleaning up");
                        session.cleanup();
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        session.done(*reference.address())?;
        debug!(%reference, tag = tag_uid, bytes = size, "upload finished");

        Ok(UploadResult {
            reference,
            encrypted_reference: grant.as_ref().map(|g| g.encrypted_reference),
            history_address: grant.map(|g| g.history_address),
            tag: tag_uid,
            size,
        })
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("concurrency", &self.concurrency)
            .field("access_control", &self.access.is_some())
            .finish_non_exhaustive()
    }
}

