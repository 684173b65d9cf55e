//! Upload session tracking.
//!
//! A [`Tag`] follows one upload through splitting, storing and propagation
//! with monotonic counters. [`SessionTracker`] hands out and finds tags.

mod error;
mod tag;
mod tracker;

pub use error::{TagError, TagResult};
pub use tag::{Tag, TagField, TagSnapshot, TagStatus};
pub use tracker::SessionTracker;
