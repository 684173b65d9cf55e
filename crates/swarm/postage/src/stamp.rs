//! Postage stamps.
//!
//! Wire layout (113 bytes, big-endian):
//! `batch_id(32) | bucket(4) | slot(4) | timestamp(8) | signature(65)`.

use alloy_primitives::{Address, B256, Keccak256, Signature};
use alloy_signer::SignerSync;
use bytes::{BufMut, Bytes, BytesMut};
use vertex_swarm_primitives::{ChunkAddress, ContentChunk};

use crate::{
    BatchId,
    batch::pack_index,
    error::{PostageError, PostageResult},
};

const BATCH_ID_SIZE: usize = 32;
const BUCKET_SIZE: usize = 4;
const SLOT_SIZE: usize = 4;
const TIMESTAMP_SIZE: usize = 8;
const SIGNATURE_SIZE: usize = 65;

/// Total encoded size of a [`PostageStamp`].
pub const POSTAGE_STAMP_SIZE: usize =
    BATCH_ID_SIZE + BUCKET_SIZE + SLOT_SIZE + TIMESTAMP_SIZE + SIGNATURE_SIZE;

/// Proof that a chunk was paid for from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostageStamp {
    batch_id: BatchId,
    bucket: u32,
    slot: u32,
    timestamp: u64,
    signature: Signature,
}

impl PostageStamp {
    /// Sign a stamp for `address` with the batch owner's key.
    pub fn sign<S: SignerSync>(
        signer: &S,
        address: &ChunkAddress,
        batch_id: BatchId,
        bucket: u32,
        slot: u32,
        timestamp: u64,
    ) -> PostageResult<Self> {
        let digest = to_sign_digest(address, &batch_id, pack_index(bucket, slot), timestamp);
        let signature = signer.sign_message_sync(digest.as_slice())?;
        Ok(Self {
            batch_id,
            bucket,
            slot,
            timestamp,
            signature,
        })
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn bucket(&self) -> u32 {
        self.bucket
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Packed `(bucket << 32) | slot` index.
    pub fn index(&self) -> u64 {
        pack_index(self.bucket, self.slot)
    }

    /// Unix time in nanoseconds at issuance.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Recover the signer of this stamp for `address`.
    pub fn recover_signer(&self, address: &ChunkAddress) -> PostageResult<Address> {
        let digest = to_sign_digest(address, &self.batch_id, self.index(), self.timestamp);
        Ok(self.signature.recover_address_from_msg(digest.as_slice())?)
    }

    /// Check that this stamp was signed by `owner` for `address`.
    pub fn verify(&self, address: &ChunkAddress, owner: Address) -> PostageResult<()> {
        if self.recover_signer(address)? != owner {
            return Err(PostageError::OwnerMismatch);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(POSTAGE_STAMP_SIZE);
        buf.put_slice(self.batch_id.as_slice());
        buf.put_u32(self.bucket);
        buf.put_u32(self.slot);
        buf.put_u64(self.timestamp);
        buf.put_slice(&self.signature.as_bytes());
        buf.freeze()
    }
}

fn to_sign_digest(address: &ChunkAddress, batch_id: &BatchId, index: u64, timestamp: u64) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(address.as_bytes());
    hasher.update(batch_id);
    hasher.update(index.to_be_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.finalize()
}

impl TryFrom<&[u8]> for PostageStamp {
    type Error = PostageError;

    fn try_from(buf: &[u8]) -> PostageResult<Self> {
        if buf.len() != POSTAGE_STAMP_SIZE {
            return Err(PostageError::IncorrectSize {
                received: buf.len(),
                expected: POSTAGE_STAMP_SIZE,
            });
        }

        let (batch_id, rest) = buf.split_at(BATCH_ID_SIZE);
        let (bucket, rest) = rest.split_at(BUCKET_SIZE);
        let (slot, rest) = rest.split_at(SLOT_SIZE);
        let (timestamp, signature) = rest.split_at(TIMESTAMP_SIZE);

        let be_u32 = |b: &[u8]| b.try_into().map(u32::from_be_bytes);
        let incorrect = |_| PostageError::IncorrectSize {
            received: buf.len(),
            expected: POSTAGE_STAMP_SIZE,
        };

        Ok(Self {
            batch_id: BatchId::from_slice(batch_id),
            bucket: be_u32(bucket).map_err(incorrect)?,
            slot: be_u32(slot).map_err(incorrect)?,
            timestamp: timestamp
                .try_into()
                .map(u64::from_be_bytes)
                .map_err(incorrect)?,
            signature: Signature::try_from(signature)?,
        })
    }
}

/// A chunk paired with the stamp that pays for it.
#[derive(Debug, Clone)]
pub struct StampedChunk {
    chunk: ContentChunk,
    stamp: PostageStamp,
}

impl StampedChunk {
    pub fn new(chunk: ContentChunk, stamp: PostageStamp) -> Self {
        Self { chunk, stamp }
    }

    pub fn chunk(&self) -> &ContentChunk {
        &self.chunk
    }

    pub fn stamp(&self) -> &PostageStamp {
        &self.stamp
    }

    pub fn address(&self) -> ChunkAddress {
        self.chunk.address()
    }

    pub fn into_parts(self) -> (ContentChunk, PostageStamp) {
        (self.chunk, self.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;
    use assert_matches::assert_matches;

    fn stamp(signer: &PrivateKeySigner, address: &ChunkAddress) -> PostageStamp {
        PostageStamp::sign(signer, address, B256::repeat_byte(5), 0xabcd, 3, 1_700_000_000).unwrap()
    }

    #[test]
    fn test_encoding_round_trip() {
        let signer = PrivateKeySigner::random();
        let address = ChunkAddress::new([1u8; 32]);
        let stamp = stamp(&signer, &address);

        let bytes = stamp.to_bytes();
        assert_eq!(bytes.len(), POSTAGE_STAMP_SIZE);
        let decoded = PostageStamp::try_from(bytes.as_ref()).unwrap();
        assert_eq!(decoded, stamp);
        assert_eq!(decoded.index(), (0xabcd << 32) | 3);
    }

    #[test]
    fn test_verify_owner() {
        let signer = PrivateKeySigner::random();
        let address = ChunkAddress::new([1u8; 32]);
        let stamp = stamp(&signer, &address);

        stamp.verify(&address, signer.address()).unwrap();

        let other = ChunkAddress::new([2u8; 32]);
        assert_matches!(
            stamp.verify(&other, signer.address()),
            Err(PostageError::OwnerMismatch)
        );
    }

    #[test]
    fn test_wrong_size() {
        assert_matches!(
            PostageStamp::try_from([0u8; 10].as_slice()),
            Err(PostageError::IncorrectSize { received: 10, .. })
        );
    }
}
