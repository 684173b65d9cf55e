//! Parity tables.
//!
//! For each level the number of parity chunks is a step function of the data
//! group size: the first threshold the size reaches selects the parity count.
//! Thresholds are tuned so that a group survives the expected chunk loss rate
//! of the level.

use vertex_swarm_primitives::{CHUNK_SIZE, HASH_SIZE, RedundancyLevel};

const MEDIUM_THRESHOLDS: &[usize] = &[95, 69, 47, 29, 15, 6, 2, 1];
const MEDIUM_PARITIES: &[usize] = &[9, 8, 7, 6, 5, 4, 3, 2];

const STRONG_THRESHOLDS: &[usize] = &[
    105, 96, 87, 78, 70, 62, 54, 47, 40, 33, 27, 21, 16, 11, 7, 4, 2, 1,
];
const STRONG_PARITIES: &[usize] = &[
    21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4,
];

const INSANE_THRESHOLDS: &[usize] = &[
    93, 88, 83, 78, 74, 69, 64, 60, 55, 51, 46, 42, 38, 34, 30, 27, 23, 20, 17, 14, 11, 9, 6, 4,
    2, 1,
];
const INSANE_PARITIES: &[usize] = &[
    31, 30, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8,
    7, 6,
];

const PARANOID_THRESHOLDS: &[usize] = &[
    37, 36, 35, 34, 33, 32, 31, 30, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14,
    13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1,
];
const PARANOID_PARITIES: &[usize] = &[
    90, 89, 88, 87, 86, 85, 84, 83, 82, 81, 80, 79, 78, 77, 76, 75, 74, 73, 72, 71, 70, 69, 68, 67,
    66, 65, 64, 63, 62, 61, 60, 59, 58, 57, 56, 55, 54,
];

fn table(level: RedundancyLevel) -> (&'static [usize], &'static [usize]) {
    match level {
        RedundancyLevel::None => (&[], &[]),
        RedundancyLevel::Medium => (MEDIUM_THRESHOLDS, MEDIUM_PARITIES),
        RedundancyLevel::Strong => (STRONG_THRESHOLDS, STRONG_PARITIES),
        RedundancyLevel::Insane => (INSANE_THRESHOLDS, INSANE_PARITIES),
        RedundancyLevel::Paranoid => (PARANOID_THRESHOLDS, PARANOID_PARITIES),
    }
}

/// Number of parity chunks for a data group of `shards` chunks.
pub fn parities(level: RedundancyLevel, shards: usize) -> usize {
    let (thresholds, parities) = table(level);
    thresholds
        .iter()
        .zip(parities)
        .find(|(threshold, _)| shards >= **threshold)
        .map(|(_, p)| *p)
        .unwrap_or_default()
}

/// Largest data group an intermediate chunk can hold at `level` when data
/// references are `ref_size` bytes. Parity references are always plain
/// addresses.
pub fn max_shards(level: RedundancyLevel, ref_size: usize) -> usize {
    let fits = |s: usize| s * ref_size + parities(level, s) * HASH_SIZE <= CHUNK_SIZE;
    (1..=CHUNK_SIZE / ref_size)
        .rev()
        .find(|s| fits(*s))
        .unwrap_or(1)
}
