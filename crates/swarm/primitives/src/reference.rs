//! References to uploaded content.

use alloy_primitives::hex;
use std::{fmt, str::FromStr};

use crate::{
    address::ChunkAddress,
    constants::{ENCRYPTED_REFERENCE_SIZE, HASH_SIZE},
    encryption::EncryptionKey,
    error::{ChunkError, Result},
};

/// A reference to a chunk: its address and, for encrypted content, the key
/// needed to decrypt it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    address: ChunkAddress,
    key: Option<EncryptionKey>,
}

impl Reference {
    /// A plain 32-byte reference.
    pub const fn plain(address: ChunkAddress) -> Self {
        Self { address, key: None }
    }

    /// A 64-byte reference to an encrypted chunk.
    pub const fn encrypted(address: ChunkAddress, key: EncryptionKey) -> Self {
        Self {
            address,
            key: Some(key),
        }
    }

    pub fn address(&self) -> &ChunkAddress {
        &self.address
    }

    pub fn key(&self) -> Option<&EncryptionKey> {
        self.key.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Serialized size: 32 or 64 bytes.
    pub fn size(&self) -> usize {
        if self.is_encrypted() {
            ENCRYPTED_REFERENCE_SIZE
        } else {
            HASH_SIZE
        }
    }

    /// Append the wire form to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.address.as_bytes());
        if let Some(key) = &self.key {
            buf.extend_from_slice(key.as_bytes());
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        self.write_to(&mut buf);
        buf
    }

    /// Parse a 32 or 64 byte reference.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        match slice.len() {
            HASH_SIZE => Ok(Self::plain(ChunkAddress::from_slice(slice)?)),
            ENCRYPTED_REFERENCE_SIZE => {
                let (address, key) = slice.split_at(HASH_SIZE);
                Ok(Self::encrypted(
                    ChunkAddress::from_slice(address)?,
                    EncryptionKey::from_slice(key)?,
                ))
            }
            len => Err(ChunkError::size(
                "reference must be 32 or 64 bytes",
                len,
                ENCRYPTED_REFERENCE_SIZE,
            )),
        }
    }
}

impl From<ChunkAddress> for Reference {
    fn from(address: ChunkAddress) -> Self {
        Self::plain(address)
    }
}

impl FromStr for Reference {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&hex::decode(s)?)
    }
}

/// Full hex encoding, 64 or 128 characters.
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_vec()))
    }
}
