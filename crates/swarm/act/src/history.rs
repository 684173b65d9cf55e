//! Grant history entries.
//!
//! Each entry is stored as a content chunk and points at the entry before
//! it, forming an append-only chain addressed by its newest entry.
//!
//! Payload layout:
//! `"ACTH" | version(1) | timestamp_be(8) | previous(32, zero = none) | ref_len(1) | encrypted_ref`

use bytes::{BufMut, Bytes, BytesMut};
use vertex_swarm_primitives::{ChunkAddress, ContentChunk, HASH_SIZE, Reference};

use crate::error::{ActError, ActResult};

const MAGIC: &[u8; 4] = b"ACTH";
const VERSION: u8 = 1;
const HEADER_SIZE: usize = MAGIC.len() + 1 + 8 + HASH_SIZE + 1;

/// One link of a grant history chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    timestamp: u64,
    previous: Option<ChunkAddress>,
    encrypted_reference: Reference,
}

impl HistoryEntry {
    pub fn new(timestamp: u64, previous: Option<ChunkAddress>, encrypted_reference: Reference) -> Self {
        Self {
            timestamp,
            previous,
            encrypted_reference,
        }
    }

    /// Unix seconds at which the grant was made; also selects the access key.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn previous(&self) -> Option<&ChunkAddress> {
        self.previous.as_ref()
    }

    pub fn encrypted_reference(&self) -> &Reference {
        &self.encrypted_reference
    }

    /// Encode into a content chunk.
    pub fn to_chunk(&self) -> ActResult<ContentChunk> {
        let reference = self.encrypted_reference.to_vec();
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + reference.len());
        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        buf.put_u64(self.timestamp);
        buf.put_slice(
            self.previous
                .as_ref()
                .unwrap_or(&ChunkAddress::ZERO)
                .as_bytes(),
        );
        buf.put_u8(reference.len() as u8);
        buf.put_slice(&reference);
        Ok(ContentChunk::new(buf.freeze())?)
    }

    /// Decode from a chunk payload.
    pub fn decode(payload: &Bytes) -> ActResult<Self> {
        let malformed = ActError::MalformedHistory;

        let Some((header, rest)) = payload.split_at_checked(HEADER_SIZE) else {
            return Err(malformed("entry shorter than header"));
        };
        let (magic, header) = header.split_at(MAGIC.len());
        if magic != MAGIC.as_slice() {
            return Err(malformed("bad magic"));
        }
        let (version, header) = header.split_at(1);
        if version != [VERSION].as_slice() {
            return Err(malformed("unsupported version"));
        }
        let (timestamp, header) = header.split_at(8);
        let (previous, ref_len) = header.split_at(HASH_SIZE);

        let timestamp = timestamp
            .try_into()
            .map(u64::from_be_bytes)
            .map_err(|_| malformed("bad timestamp"))?;
        let previous = ChunkAddress::from_slice(previous)?;
        let ref_len = ref_len.first().copied().unwrap_or_default() as usize;
        if rest.len() != ref_len {
            return Err(malformed("reference length mismatch"));
        }
        let encrypted_reference =
            Reference::from_slice(rest).map_err(|_| malformed("bad reference size"))?;

        Ok(Self {
            timestamp,
            previous: (!previous.is_zero()).then_some(previous),
            encrypted_reference,
        })
    }
}
