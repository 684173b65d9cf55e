//! Content-addressed chunks.
//!
//! A [`ContentChunk`] is a span prefix followed by at most [`CHUNK_SIZE`]
//! payload bytes. Its address is the BMT hash of both and is computed lazily
//! and cached.

use bytes::{BufMut, Bytes, BytesMut};
use std::sync::OnceLock;

use crate::{
    address::ChunkAddress,
    bmt::BmtHasher,
    constants::{CHUNK_SIZE, MAX_CHUNK_SIZE, SPAN_SIZE},
    error::{ChunkError, Result},
    span::Span,
};

/// A content-addressed chunk.
#[derive(Debug, Clone)]
pub struct ContentChunk {
    span: [u8; SPAN_SIZE],
    payload: Bytes,
    address: OnceLock<ChunkAddress>,
}

impl ContentChunk {
    /// Create a leaf chunk. The span is the payload length.
    pub fn new(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let span = Span::new(payload.len() as u64);
        Self::with_span(span, payload)
    }

    /// Create a chunk with an explicit span, as used for intermediate chunks.
    pub fn with_span(span: Span, payload: impl Into<Bytes>) -> Result<Self> {
        Self::from_parts(span.encode(), payload)
    }

    /// Create a chunk from raw span bytes. Encrypted and parity chunks carry
    /// spans that do not decode to a meaningful length.
    pub fn from_parts(span: [u8; SPAN_SIZE], payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > CHUNK_SIZE {
            return Err(ChunkError::size(
                "payload exceeds chunk size",
                payload.len(),
                CHUNK_SIZE,
            ));
        }
        Ok(Self {
            span,
            payload,
            address: OnceLock::new(),
        })
    }

    /// Parse `data` and check that it hashes to `address`.
    pub fn verified(address: &ChunkAddress, data: Bytes) -> Result<Self> {
        let chunk = Self::try_from(data)?;
        let actual = chunk.address();
        if actual != *address {
            return Err(ChunkError::verification(
                "content address mismatch",
                address.to_hex(),
                actual.to_hex(),
            ));
        }
        Ok(chunk)
    }

    /// The address of the chunk.
    pub fn address(&self) -> ChunkAddress {
        *self.address.get_or_init(|| {
            let mut hasher = BmtHasher::new();
            hasher.set_span_bytes(self.span);
            hasher.address_of(&self.payload)
        })
    }

    /// Raw span bytes.
    pub fn span_bytes(&self) -> [u8; SPAN_SIZE] {
        self.span
    }

    /// Decoded span.
    pub fn span(&self) -> Span {
        Span::decode(self.span)
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Size on the wire: span plus payload.
    pub fn size(&self) -> usize {
        SPAN_SIZE + self.payload.len()
    }

    /// Wire encoding: span followed by payload.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_slice(&self.span);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

impl PartialEq for ContentChunk {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.payload == other.payload
    }
}

impl Eq for ContentChunk {}

impl From<ContentChunk> for Bytes {
    fn from(chunk: ContentChunk) -> Self {
        chunk.to_bytes()
    }
}

impl TryFrom<Bytes> for ContentChunk {
    type Error = ChunkError;

    fn try_from(mut buf: Bytes) -> Result<Self> {
        if buf.len() < SPAN_SIZE {
            return Err(ChunkError::size("chunk shorter than span", buf.len(), SPAN_SIZE));
        }
        if buf.len() > MAX_CHUNK_SIZE {
            return Err(ChunkError::size(
                "chunk exceeds maximum size",
                buf.len(),
                MAX_CHUNK_SIZE,
            ));
        }
        let span_bytes = buf.split_to(SPAN_SIZE);
        let mut span = [0u8; SPAN_SIZE];
        span.copy_from_slice(&span_bytes);
        Self::from_parts(span, buf)
    }
}

impl TryFrom<&[u8]> for ContentChunk {
    type Error = ChunkError;

    fn try_from(buf: &[u8]) -> Result<Self> {
        Self::try_from(Bytes::copy_from_slice(buf))
    }
}
