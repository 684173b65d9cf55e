//! Span encoding.
//!
//! The span is a little-endian `u64`. Intermediate chunks built with
//! redundancy reuse the two top bytes: byte 7 holds `0x80 | level` and byte 6
//! holds the number of parity references in the payload. The logical length
//! always fits in the low six bytes.

use crate::{constants::SPAN_SIZE, level::RedundancyLevel};

const LEVEL_FLAG: u8 = 0x80;
const LENGTH_MASK: u64 = 0x0000_ffff_ffff_ffff;

/// A decoded span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    length: u64,
    level: RedundancyLevel,
    parities: u8,
}

impl Span {
    /// A plain span carrying only a length.
    pub const fn new(length: u64) -> Self {
        Self {
            length,
            level: RedundancyLevel::None,
            parities: 0,
        }
    }

    /// A span for an intermediate chunk carrying `parities` parity references.
    pub const fn with_redundancy(length: u64, level: RedundancyLevel, parities: u8) -> Self {
        Self {
            length,
            level,
            parities,
        }
    }

    /// Decode raw span bytes.
    pub fn decode(bytes: [u8; SPAN_SIZE]) -> Self {
        let raw = u64::from_le_bytes(bytes);
        let [.., parities, flags] = bytes;
        if flags & LEVEL_FLAG != 0 {
            if let Some(level) = RedundancyLevel::from_repr(flags & !LEVEL_FLAG) {
                return Self {
                    length: raw & LENGTH_MASK,
                    level,
                    parities,
                };
            }
        }
        Self::new(raw)
    }

    /// Encode into raw span bytes.
    pub fn encode(&self) -> [u8; SPAN_SIZE] {
        if !self.level.is_enabled() {
            return self.length.to_le_bytes();
        }
        let mut bytes = (self.length & LENGTH_MASK).to_le_bytes();
        bytes[6] = self.parities;
        bytes[7] = LEVEL_FLAG | self.level as u8;
        bytes
    }

    /// Logical number of bytes covered.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn level(&self) -> RedundancyLevel {
        self.level
    }

    /// Number of parity references in the chunk payload.
    pub fn parities(&self) -> usize {
        self.parities as usize
    }
}
