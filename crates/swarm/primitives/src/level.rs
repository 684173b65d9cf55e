//! Redundancy levels for erasure-coded uploads.

use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Redundancy level selecting the parity-to-data ratio of an upload.
///
/// Higher levels tolerate more missing chunks per group at a higher storage
/// cost. The numeric value is what gets encoded into intermediate spans.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumString,
    EnumIter,
    FromRepr,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum RedundancyLevel {
    #[default]
    None = 0,
    Medium = 1,
    Strong = 2,
    Insane = 3,
    Paranoid = 4,
}

impl RedundancyLevel {
    /// Returns true if parity chunks are produced at this level.
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}
