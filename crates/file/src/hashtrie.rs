//! Bottom-up hash tree construction.
//!
//! Leaves are appended to level 0. Each level buffers the references of its
//! pending children and is wrapped into an intermediate chunk one level up as
//! soon as it holds a full set of children. At a redundancy level above none,
//! wrapping first derives parity chunks for the buffered siblings and appends
//! their addresses after the data references.
//!
//! On finish, levels are closed bottom-up. A level with a single pending
//! child hands it up unchanged, so no intermediate chunk ever has exactly one
//! child, and the first level whose single child has nothing above it holds
//! the root.

use std::mem;

use bytes::Bytes;
use tracing::trace;
use vertex_swarm_primitives::{CHUNK_SIZE, ContentChunk, HASH_SIZE, Reference, Span};
use vertex_swarm_redundancy::{ParityEncoder, max_shards};

use crate::{
    error::{FileError, FileResult},
    stage::ChunkSealer,
};

/// Span covered by each child of a node spanning `span` bytes with the given
/// branching factor: the smallest full subtree size whose parent could hold
/// `span`.
pub fn child_capacity(span: u64, branches: usize) -> u64 {
    let branches = branches as u64;
    let mut capacity = CHUNK_SIZE as u64;
    if branches < 2 {
        return capacity;
    }
    while capacity.saturating_mul(branches) < span {
        capacity = capacity.saturating_mul(branches);
    }
    capacity
}

#[derive(Debug)]
struct Child {
    reference: Reference,
    /// Stored form of the child, kept while parity may still need it.
    chunk: Option<ContentChunk>,
    span: u64,
}

/// Incremental builder of one file's hash tree.
///
/// [`write`](Self::write) and [`finish`](Self::finish) return the chunks that
/// became ready, in the order they must be stored; the caller does the I/O.
#[derive(Debug)]
pub struct HashTrie {
    sealer: Box<dyn ChunkSealer>,
    parity: ParityEncoder,
    branches: usize,
    levels: Vec<Vec<Child>>,
    leaves: u64,
}

impl HashTrie {
    pub fn new(sealer: Box<dyn ChunkSealer>, parity: ParityEncoder) -> Self {
        let branches = max_shards(parity.level(), sealer.reference_size());
        Self {
            sealer,
            parity,
            branches,
            levels: Vec::new(),
            leaves: 0,
        }
    }

    /// Data children per intermediate chunk.
    pub fn branches(&self) -> usize {
        self.branches
    }

    /// Number of leaves written so far.
    pub fn leaves(&self) -> u64 {
        self.leaves
    }

    /// Append one leaf of at most [`CHUNK_SIZE`] bytes.
    pub fn write(&mut self, data: &[u8]) -> FileResult<Vec<ContentChunk>> {
        if data.len() > CHUNK_SIZE {
            return Err(FileError::Internal("leaf exceeds chunk size"));
        }
        let span = data.len() as u64;
        let chunk = ContentChunk::with_span(Span::new(span), Bytes::copy_from_slice(data))?;
        let sealed = self.sealer.seal(chunk)?;
        self.leaves += 1;

        let mut ready = vec![sealed.chunk.clone()];
        let child = self.child(sealed.reference, sealed.chunk, span);
        self.append(0, child, &mut ready)?;
        Ok(ready)
    }

    /// Close all levels and return the root reference together with the
    /// remaining chunks.
    pub fn finish(mut self) -> FileResult<(Reference, Vec<ContentChunk>)> {
        let mut ready = Vec::new();
        if self.leaves == 0 {
            ready = self.write(&[])?;
        }

        let mut level = 0;
        while level < self.levels.len() {
            let pending = self.levels.get(level).map_or(0, Vec::len);
            let above = self
                .levels
                .iter()
                .skip(level + 1)
                .any(|children| !children.is_empty());

            match pending {
                0 => {}
                1 => {
                    let child = self
                        .levels
                        .get_mut(level)
                        .and_then(Vec::pop)
                        .ok_or(FileError::Internal("hash tree level vanished"))?;
                    if !above {
                        trace!(level, leaves = self.leaves, "hash tree closed");
                        return Ok((child.reference, ready));
                    }
                    self.append(level + 1, child, &mut ready)?;
                }
                _ => {
                    let parent = self.wrap(level, &mut ready)?;
                    self.append(level + 1, parent, &mut ready)?;
                }
            }
            level += 1;
        }

        Err(FileError::Internal("hash tree has no root"))
    }

    fn child(&self, reference: Reference, chunk: ContentChunk, span: u64) -> Child {
        Child {
            reference,
            chunk: self.parity.level().is_enabled().then_some(chunk),
            span,
        }
    }

    /// Add `child` to `level`, wrapping every level that fills up on the way.
    fn append(&mut self, mut level: usize, child: Child, ready: &mut Vec<ContentChunk>) -> FileResult<()> {
        let mut pending = Some(child);
        while let Some(child) = pending.take() {
            if self.levels.len() <= level {
                self.levels.resize_with(level + 1, Vec::new);
            }
            let children = self
                .levels
                .get_mut(level)
                .ok_or(FileError::Internal("hash tree level missing"))?;
            children.push(child);

            if children.len() >= self.branches {
                pending = Some(self.wrap(level, ready)?);
                level += 1;
            }
        }
        Ok(())
    }

    /// Turn the pending children of `level` into their parent chunk.
    fn wrap(&mut self, level: usize, ready: &mut Vec<ContentChunk>) -> FileResult<Child> {
        let children = self
            .levels
            .get_mut(level)
            .map(mem::take)
            .unwrap_or_default();

        let span: u64 = children.iter().map(|c| c.span).sum();
        let stored: Vec<ContentChunk> = children.iter().filter_map(|c| c.chunk.clone()).collect();
        let parities = self.parity.encode(&stored)?;

        let mut payload = Vec::with_capacity(
            children.len() * self.sealer.reference_size() + parities.len() * HASH_SIZE,
        );
        for child in &children {
            child.reference.write_to(&mut payload);
        }
        for parity in &parities {
            payload.extend_from_slice(parity.address().as_bytes());
        }

        let span_field = if self.parity.level().is_enabled() {
            let count = u8::try_from(parities.len())
                .map_err(|_| FileError::Internal("parity count exceeds span field"))?;
            Span::with_redundancy(span, self.parity.level(), count)
        } else {
            Span::new(span)
        };

        trace!(
            level,
            children = children.len(),
            parities = parities.len(),
            span,
            "wrapped hash tree level"
        );
        ready.extend(parities);

        let sealed = self.sealer.seal(ContentChunk::with_span(span_field, payload)?)?;
        ready.push(sealed.chunk.clone());
        Ok(self.child(sealed.reference, sealed.chunk, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{EncryptingSealer, PlainSealer};
    use vertex_swarm_primitives::{ChunkAddress, RedundancyLevel};
    use vertex_swarm_redundancy::parities;

    fn plain() -> HashTrie {
        HashTrie::new(Box::new(PlainSealer), ParityEncoder::new(RedundancyLevel::None))
    }

    /// Feed `len` bytes in chunk-sized writes and collect every produced chunk.
    fn build(mut trie: HashTrie, len: usize) -> (Reference, Vec<ContentChunk>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut chunks = Vec::new();
        for leaf in data.chunks(CHUNK_SIZE) {
            chunks.extend(trie.write(leaf).unwrap());
        }
        let (root, rest) = trie.finish().unwrap();
        chunks.extend(rest);
        (root, chunks)
    }

    fn find(chunks: &[ContentChunk], address: &ChunkAddress) -> ContentChunk {
        chunks
            .iter()
            .find(|c| &c.address() == address)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_child_capacity() {
        assert_eq!(child_capacity(4097, 128), 4096);
        assert_eq!(child_capacity(128 * 4096, 128), 4096);
        assert_eq!(child_capacity(128 * 4096 + 1, 128), 128 * 4096);
        assert_eq!(child_capacity(10_000, 64), 4096);
        assert_eq!(child_capacity(64 * 4096 + 1, 64), 64 * 4096);
    }

    #[test]
    fn test_empty_input_is_empty_leaf() {
        let (root, chunks) = build(plain(), 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(root.address(), &ContentChunk::new(Vec::new()).unwrap().address());
    }

    #[test]
    fn test_single_leaf_is_root() {
        let (root, chunks) = build(plain(), CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(root.address(), &chunks[0].address());
        assert_eq!(chunks[0].span().length(), CHUNK_SIZE as u64);
    }

    #[test]
    fn test_two_leaves_get_a_parent() {
        let (root, chunks) = build(plain(), CHUNK_SIZE + 1);
        assert_eq!(chunks.len(), 3);
        let root = find(&chunks, root.address());
        assert_eq!(root.span().length(), CHUNK_SIZE as u64 + 1);
        assert_eq!(root.payload().len(), 2 * HASH_SIZE);
    }

    #[test]
    fn test_single_trailing_leaf_is_carried_up() {
        // 129 leaves: one full intermediate plus a leaf lifted beside it.
        let (root, chunks) = build(plain(), 128 * CHUNK_SIZE + 1);
        assert_eq!(chunks.len(), 129 + 2);
        let root = find(&chunks, root.address());
        assert_eq!(root.payload().len(), 2 * HASH_SIZE);

        let last = Reference::from_slice(&root.payload()[HASH_SIZE..]).unwrap();
        assert_eq!(find(&chunks, last.address()).span().length(), 1);
    }

    #[test]
    fn test_full_level_chain() {
        // Exactly 128 leaves collapse into one parent without carrying.
        let (root, chunks) = build(plain(), 128 * CHUNK_SIZE);
        assert_eq!(chunks.len(), 129);
        assert_eq!(find(&chunks, root.address()).payload().len(), 128 * HASH_SIZE);
    }

    #[test]
    fn test_encrypted_references() {
        let trie = HashTrie::new(
            Box::new(EncryptingSealer),
            ParityEncoder::new(RedundancyLevel::None),
        );
        assert_eq!(trie.branches(), 64);
        let (root, chunks) = build(trie, 3 * CHUNK_SIZE);
        assert!(root.is_encrypted());
        let stored = find(&chunks, root.address());
        assert_eq!(stored.payload().len(), 3 * 64);
    }

    #[test]
    fn test_parity_appended_to_parent() {
        let level = RedundancyLevel::Medium;
        let trie = HashTrie::new(Box::new(PlainSealer), ParityEncoder::new(level));
        assert_eq!(trie.branches(), 119);

        let (root, chunks) = build(trie, 10 * CHUNK_SIZE);
        let expected_parities = parities(level, 10);
        assert_eq!(chunks.len(), 10 + expected_parities + 1);

        let root = find(&chunks, root.address());
        let span = root.span();
        assert_eq!(span.length(), 10 * CHUNK_SIZE as u64);
        assert_eq!(span.level(), level);
        assert_eq!(span.parities(), expected_parities);
        assert_eq!(
            root.payload().len(),
            10 * HASH_SIZE + expected_parities * HASH_SIZE
        );
    }

    #[test]
    fn test_root_is_deterministic() {
        let (a, _) = build(plain(), 300_000);
        let (b, _) = build(plain(), 300_000);
        assert_eq!(a, b);
    }
}
