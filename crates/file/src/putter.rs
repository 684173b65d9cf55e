//! Two-phase upload session.
//!
//! A [`PutterSession`] stamps and stores every chunk of one upload and owns
//! the reservations that make the upload look complete: the tag and the
//! staged pin. It ends exactly once, either committed by
//! [`done`](PutterSession::done) or aborted by
//! [`cleanup`](PutterSession::cleanup). Dropping a session that is still
//! staging aborts it.
//!
//! Aborting never deletes stored chunks. They are content addressed and may
//! be shared with other uploads; the store owns their lifetime.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, trace};
use vertex_swarm_act::{PutError, Putter};
use vertex_swarm_postage::Stamper;
use vertex_swarm_primitives::{ChunkAddress, ContentChunk};
use vertex_swarm_storer::{ChunkStore, PinCollection};
use vertex_swarm_tags::{Tag, TagField};

use crate::{
    context::Context,
    error::{FileError, FileResult},
};

/// Lifecycle of a [`PutterSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Staging,
    Committed,
    Aborted,
}

/// Stamps, stores and accounts the chunks of one upload.
pub struct PutterSession {
    ctx: Context,
    store: Arc<dyn ChunkStore>,
    stamper: Stamper,
    tag: Option<Arc<Tag>>,
    deferred: bool,
    pins: Mutex<Option<PinCollection>>,
    state: Mutex<SessionState>,
}

impl PutterSession {
    pub fn new(
        ctx: Context,
        store: Arc<dyn ChunkStore>,
        stamper: Stamper,
        tag: Option<Arc<Tag>>,
        deferred: bool,
        pins: Option<PinCollection>,
    ) -> Self {
        Self {
            ctx,
            store,
            stamper,
            tag,
            deferred,
            pins: Mutex::new(pins),
            state: Mutex::new(SessionState::Staging),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn tag(&self) -> Option<&Arc<Tag>> {
        self.tag.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Stamp and store one chunk.
    pub async fn put(&self, chunk: ContentChunk) -> FileResult<()> {
        if self.state() != SessionState::Staging {
            return Err(FileError::Internal("put on a closed upload session"));
        }
        let address = chunk.address();

        if let Some(tag) = &self.tag {
            tag.increment(TagField::Split, 1)?;
        }

        let stamped = self.ctx.run(self.stamper.stamp(chunk)).await.inspect_err(|err| {
            debug!(%address, batch = %self.stamper.batch_id(), %err, "stamping failed");
        })?;
        let existed = self.ctx.run(self.store.put(&stamped)).await?;

        if let Some(tag) = &self.tag {
            if existed {
                tag.increment(TagField::Seen, 1)?;
            }
            tag.increment(TagField::Stored, 1)?;
            if !self.deferred {
                tag.increment(TagField::Sent, 1)?;
            }
        }
        if let Some(pins) = self.pins.lock().as_ref() {
            pins.add(address);
        }

        counter!("file_upload_chunks_total").increment(1);
        trace!(%address, existed, "stored chunk");
        Ok(())
    }

    /// Commit the upload under `root`: finish the tag and the pin.
    pub fn done(&self, root: ChunkAddress) -> FileResult<()> {
        {
            let mut state = self.state.lock();
            if *state != SessionState::Staging {
                return Err(FileError::Internal("upload session already closed"));
            }
            *state = SessionState::Committed;
        }

        if let Some(tag) = &self.tag {
            tag.done(root);
        }
        if let Some(pins) = self.pins.lock().take() {
            pins.commit(root);
        }
        debug!(%root, tag = self.tag.as_ref().map(|t| t.uid()), "upload committed");
        Ok(())
    }

    /// Abort the upload: drop the staged pin and mark the tag failed.
    ///
    /// A no-op once the session is committed or aborted.
    pub fn cleanup(&self) {
        {
            let mut state = self.state.lock();
            if *state != SessionState::Staging {
                return;
            }
            *state = SessionState::Aborted;
        }

        if let Some(tag) = &self.tag {
            tag.fail();
        }
        if let Some(pins) = self.pins.lock().take() {
            pins.abort();
        }
        debug!(tag = self.tag.as_ref().map(|t| t.uid()), "upload aborted");
    }
}

impl Drop for PutterSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for PutterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutterSession")
            .field("stamper", &self.stamper)
            .field("tag", &self.tag.as_ref().map(|t| t.uid()))
            .field("deferred", &self.deferred)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Putter for PutterSession {
    async fn put(&self, chunk: ContentChunk) -> Result<(), PutError> {
        PutterSession::put(self, chunk)
            .await
            .map_err(|err| Box::new(err) as PutError)
    }
}
