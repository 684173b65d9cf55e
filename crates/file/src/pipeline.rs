//! Streaming feeder from a byte source into the hash tree and the session.

use std::sync::Arc;

use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use metrics::histogram;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;
use vertex_swarm_primitives::{CHUNK_SIZE, ContentChunk, Reference};

use crate::{
    context::Context,
    error::FileResult,
    hashtrie::HashTrie,
    putter::PutterSession,
};

/// Fill `buf` from `reader`, returning fewer bytes only at end of input.
async fn read_block<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        let n = reader.read(rest).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Bounded set of in-flight chunk puts.
struct Feeder {
    session: Arc<PutterSession>,
    in_flight: FuturesUnordered<BoxFuture<'static, FileResult<()>>>,
    concurrency: usize,
}

impl Feeder {
    fn new(session: Arc<PutterSession>, concurrency: usize) -> Self {
        Self {
            session,
            in_flight: FuturesUnordered::new(),
            concurrency: concurrency.max(1),
        }
    }

    /// Queue chunks for storing, waiting for a free slot when at the limit.
    /// Stops at the first failed put; the remaining puts are dropped with the
    /// feeder.
    async fn submit(&mut self, chunks: Vec<ContentChunk>) -> FileResult<()> {
        for chunk in chunks {
            while self.in_flight.len() >= self.concurrency {
                if let Some(res) = self.in_flight.next().await {
                    res?;
                }
            }
            let session = self.session.clone();
            self.in_flight
                .push(async move { session.put(chunk).await }.boxed());
        }
        Ok(())
    }

    async fn drain(&mut self) -> FileResult<()> {
        while let Some(res) = self.in_flight.next().await {
            res?;
        }
        Ok(())
    }
}

/// Split `reader` into chunks, store them through `session` and return the
/// root reference with the number of bytes read.
pub(crate) async fn run<R>(
    ctx: &Context,
    mut reader: R,
    mut trie: HashTrie,
    session: Arc<PutterSession>,
    concurrency: usize,
) -> FileResult<(Reference, u64)>
where
    R: AsyncRead + Unpin,
{
    let mut feeder = Feeder::new(session, concurrency);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = ctx.run(read_block(&mut reader, &mut buf)).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        let block = buf.get(..n).unwrap_or_default();
        feeder.submit(trie.write(block)?).await?;
        if n < CHUNK_SIZE {
            break;
        }
    }

    let leaves = trie.leaves();
    let (root, rest) = trie.finish()?;
    feeder.submit(rest).await?;
    feeder.drain().await?;

    histogram!("file_upload_bytes").record(total as f64);
    debug!(root = %root.address(), bytes = total, leaves, "split complete");
    Ok((root, total))
}
