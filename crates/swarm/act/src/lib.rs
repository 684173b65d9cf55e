//! Access control for Swarm references.
//!
//! A [`HistoryController`] encrypts a reference under a key derived from the
//! publisher secret and the grant time, and records the grant in a chain of
//! [`HistoryEntry`] chunks. Anyone holding the secret and a history address
//! can walk the chain back to the plain reference.

mod controller;
mod error;
mod history;

pub use controller::{AccessController, AccessGrant, GrantKey, HistoryController, Putter};
pub use error::{ActError, ActResult, PutError};
pub use history::HistoryEntry;
