//! Chunk address definition and operations

use alloy_primitives::{B256, hex};
use std::{fmt, str::FromStr};

use crate::{
    constants::HASH_SIZE,
    error::{ChunkError, Result},
};

/// A 256 bit address for a chunk in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkAddress(B256);

impl ChunkAddress {
    /// The all-zero address.
    pub const ZERO: Self = Self(B256::ZERO);

    /// Creates a new ChunkAddress from raw bytes
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(B256::new(bytes))
    }

    /// Creates a new address from a slice, checking the length
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; HASH_SIZE] = slice.try_into().map_err(|_| {
            ChunkError::size("address must be exactly 32 bytes", slice.len(), HASH_SIZE)
        })?;
        Ok(Self::new(bytes))
    }

    /// Returns the underlying bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0.0
    }

    /// Returns the address as a `B256`.
    pub fn to_b256(self) -> B256 {
        self.0
    }

    /// Checks if this address is zeros
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The first four bytes as a big-endian integer, used for bucket selection.
    pub fn prefix_u32(&self) -> u32 {
        let [a, b, c, d, ..] = self.0.0;
        u32::from_be_bytes([a, b, c, d])
    }

    /// Full lowercase hex encoding without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<B256> for ChunkAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; HASH_SIZE]> for ChunkAddress {
    fn from(value: [u8; HASH_SIZE]) -> Self {
        Self::new(value)
    }
}

impl From<ChunkAddress> for B256 {
    fn from(value: ChunkAddress) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for ChunkAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl FromStr for ChunkAddress {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

/// Short form: the first eight bytes in hex.
impl fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(ChunkAddress::from_slice(&[0u8; 31]).is_err());
        assert!(ChunkAddress::from_slice(&[0u8; 33]).is_err());
        assert!(ChunkAddress::from_slice(&[0u8; 32]).unwrap().is_zero());
    }

    #[test]
    fn test_hex_round_trip() {
        let addr = ChunkAddress::new([0xab; 32]);
        let parsed: ChunkAddress = addr.to_hex().parse().unwrap();
        assert_eq!(addr, parsed);

        let prefixed: ChunkAddress = format!("0x{}", addr.to_hex()).parse().unwrap();
        assert_eq!(addr, prefixed);
    }

    #[test]
    fn test_display_is_short() {
        let addr = ChunkAddress::new([0x11; 32]);
        assert_eq!(addr.to_string(), "1111111111111111");
    }

    #[test]
    fn test_prefix_u32() {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(ChunkAddress::new(bytes).prefix_u32(), 0x1234_5678);
    }
}
