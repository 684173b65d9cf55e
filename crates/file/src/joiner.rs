//! Reconstruction of files from their root reference.
//!
//! The tree is walked depth-first in child order with an explicit stack, so
//! bytes come out lazily and in file order. Children of one intermediate
//! chunk are fetched concurrently. When some of them are missing and the
//! parent carries parity references, the group is rebuilt from parity before
//! giving up.

use std::sync::Arc;

use bytes::Bytes;
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use tracing::{debug, trace};
use vertex_swarm_primitives::{
    CHUNK_SIZE, ChunkAddress, ContentChunk, HASH_SIZE, Reference, SPAN_SIZE, Span,
};
use vertex_swarm_redundancy::{max_shards, recover};
use vertex_swarm_storer::{ChunkStore, StorerError};

use crate::{
    args::DEFAULT_CONCURRENCY,
    context::Context,
    error::{FileError, FileResult},
    hashtrie::child_capacity,
};

/// The chunk a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootChunk {
    /// A content addressed chunk, decrypted when the reference carried a key.
    Content {
        chunk: ContentChunk,
        /// Size of the references inside the tree.
        ref_size: usize,
    },
    /// Bytes stored under an address they do not hash to. Only their length
    /// is reported; they are never streamed as file content.
    Raw(Bytes),
}

impl RootChunk {
    /// Length of the file: the span of a content chunk, otherwise the raw
    /// byte count.
    pub fn length(&self) -> u64 {
        match self {
            Self::Content { chunk, .. } => chunk.span().length(),
            Self::Raw(data) => data.len() as u64,
        }
    }
}

/// Error for a root whose bytes do not hash to its address.
pub(crate) fn unverified_root() -> FileError {
    FileError::Internal("root chunk failed address verification")
}

fn is_leaf(chunk: &ContentChunk) -> bool {
    chunk.span().length() <= CHUNK_SIZE as u64
}

fn leaf_data(chunk: &ContentChunk) -> Bytes {
    let len = (chunk.span().length() as usize).min(chunk.payload().len());
    chunk.payload().slice(..len)
}

/// Verify `data` against the reference's address and decrypt it.
fn open(reference: &Reference, data: Bytes) -> FileResult<ContentChunk> {
    let chunk = ContentChunk::verified(reference.address(), data)?;
    match reference.key() {
        Some(key) => Ok(key.transform_chunk(&chunk)?),
        None => Ok(chunk),
    }
}

/// Split an intermediate payload into data references and parity addresses.
fn split_payload(chunk: &ContentChunk, ref_size: usize) -> FileResult<(Vec<Reference>, Vec<ChunkAddress>)> {
    let malformed = || FileError::Internal("malformed intermediate chunk");
    let payload = chunk.payload();
    let data_len = payload
        .len()
        .checked_sub(chunk.span().parities() * HASH_SIZE)
        .ok_or_else(malformed)?;
    if data_len == 0 || data_len % ref_size != 0 {
        return Err(malformed());
    }

    let (data, parity) = payload.split_at(data_len);
    let references = data
        .chunks(ref_size)
        .map(Reference::from_slice)
        .collect::<Result<Vec<_>, _>>()?;
    let parities = parity
        .chunks(HASH_SIZE)
        .map(ChunkAddress::from_slice)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((references, parities))
}

/// Cut a recovered full-size shard back to the chunk it encodes.
///
/// The span tells the length: a leaf holds `span` bytes, an intermediate one
/// reference per child plus its parity addresses.
fn trim_shard(shard: &Bytes, reference: &Reference, ref_size: usize) -> FileResult<Bytes> {
    let span_bytes: [u8; SPAN_SIZE] = shard
        .get(..SPAN_SIZE)
        .and_then(|s| s.try_into().ok())
        .ok_or(FileError::Internal("recovered shard too short"))?;
    let span = Span::decode(match reference.key() {
        Some(key) => key.decrypt_span(span_bytes),
        None => span_bytes,
    });

    let payload_len = if span.length() <= CHUNK_SIZE as u64 {
        span.length() as usize
    } else {
        let capacity = child_capacity(span.length(), max_shards(span.level(), ref_size));
        span.length().div_ceil(capacity) as usize * ref_size + span.parities() * HASH_SIZE
    };

    let end = SPAN_SIZE + payload_len;
    if end > shard.len() {
        return Err(FileError::Internal("recovered span exceeds shard"));
    }
    Ok(shard.slice(..end))
}

/// Fetches and decodes hash trees from a [`ChunkStore`].
#[derive(Clone)]
pub struct Joiner {
    store: Arc<dyn ChunkStore>,
    concurrency: usize,
}

impl Joiner {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    async fn fetch(&self, ctx: &Context, address: &ChunkAddress) -> FileResult<Option<Bytes>> {
        match ctx.run(self.store.get(address)).await {
            Ok(data) => Ok(Some(data)),
            Err(FileError::Store(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn fetch_all(&self, ctx: &Context, addresses: &[ChunkAddress]) -> FileResult<Vec<Option<Bytes>>> {
        stream::iter(addresses.iter().copied())
            .map(|address| async move { self.fetch(ctx, &address).await })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Fetch the chunk behind `reference`.
    ///
    /// A miss is a not-found error. Bytes that fail address verification
    /// resolve to [`RootChunk::Raw`] when they fit one chunk and the reference
    /// is plain, so their length can still be reported; otherwise they are
    /// rejected as corrupt.
    pub async fn resolve(&self, ctx: &Context, reference: &Reference) -> FileResult<RootChunk> {
        let address = reference.address();
        let data = self
            .fetch(ctx, address)
            .await?
            .ok_or(StorerError::NotFound(*address))?;

        let ref_size = reference.size();
        match open(reference, data.clone()) {
            Ok(chunk) => Ok(RootChunk::Content { chunk, ref_size }),
            Err(FileError::Chunk(_)) if !reference.is_encrypted() && data.len() <= CHUNK_SIZE => {
                trace!(%address, len = data.len(), "root is not content addressed, reading raw");
                Ok(RootChunk::Raw(data))
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch, verify and decrypt the children of an intermediate chunk, in
    /// order, recovering missing ones from parity when possible.
    async fn children(&self, ctx: &Context, parent: &ContentChunk, ref_size: usize) -> FileResult<Vec<ContentChunk>> {
        let (references, parity) = split_payload(parent, ref_size)?;
        let addresses: Vec<ChunkAddress> = references.iter().map(|r| *r.address()).collect();
        let mut fetched = self.fetch_all(ctx, &addresses).await?;

        let missing: Vec<usize> = fetched
            .iter()
            .enumerate()
            .filter_map(|(i, data)| data.is_none().then_some(i))
            .collect();

        if let Some(&first) = missing.first() {
            if parity.is_empty() {
                let address = addresses.get(first).copied().unwrap_or_default();
                return Err(StorerError::NotFound(address).into());
            }

            let parity_data = self.fetch_all(ctx, &parity).await?;
            let shards = recover(&fetched, &parity_data)?;
            for &index in &missing {
                let (Some(shard), Some(reference), Some(slot)) =
                    (shards.get(index), references.get(index), fetched.get_mut(index))
                else {
                    return Err(FileError::Internal("recovered group is short"));
                };
                *slot = Some(trim_shard(shard, reference, ref_size)?);
            }
            debug!(
                parent = %parent.address(),
                missing = missing.len(),
                parities = parity.len(),
                "recovered missing children"
            );
        }

        references
            .iter()
            .zip(fetched)
            .map(|(reference, data)| {
                let data = data.ok_or(FileError::Internal("child missing after recovery"))?;
                open(reference, data)
            })
            .collect()
    }

    /// Lazily stream the file under `root`.
    ///
    /// The stream ends after the last byte or at the first error; it cannot
    /// be restarted. A raw root yields a single corruption error.
    pub fn stream(&self, ctx: &Context, root: RootChunk) -> BoxStream<'static, FileResult<Bytes>> {
        let (chunk, ref_size) = match root {
            RootChunk::Raw(_) => {
                return stream::once(async { Err(unverified_root()) }).boxed();
            }
            RootChunk::Content { chunk, ref_size } => (chunk, ref_size),
        };

        struct Walk {
            joiner: Joiner,
            ctx: Context,
            ref_size: usize,
            stack: Vec<ContentChunk>,
        }

        let walk = Walk {
            joiner: self.clone(),
            ctx: ctx.clone(),
            ref_size,
            stack: vec![chunk],
        };

        stream::try_unfold(walk, |mut walk| async move {
            while let Some(chunk) = walk.stack.pop() {
                if is_leaf(&chunk) {
                    let data = leaf_data(&chunk);
                    if data.is_empty() {
                        continue;
                    }
                    return Ok(Some((data, walk)));
                }
                let children = walk
                    .joiner
                    .children(&walk.ctx, &chunk, walk.ref_size)
                    .await?;
                walk.stack.extend(children.into_iter().rev());
            }
            Ok::<_, FileError>(None)
        })
        .boxed()
    }
}

impl std::fmt::Debug for Joiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joiner")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
