//! Registry of upload sessions.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    Tag, TagField, TagSnapshot,
    error::{TagError, TagResult},
};

/// Creates and looks up tags by id.
///
/// The map is only locked to find or insert a tag; counter updates go
/// straight to the tag's own atomics.
#[derive(Debug)]
pub struct SessionTracker {
    tags: RwLock<HashMap<u64, Arc<Tag>>>,
    next_uid: AtomicU64,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self {
            tags: RwLock::new(HashMap::new()),
            next_uid: AtomicU64::new(1),
        }
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new tag.
    pub fn create(&self) -> Arc<Tag> {
        let uid = self.next_uid.fetch_add(1, Ordering::Relaxed);
        let tag = Arc::new(Tag::new(uid));
        self.tags.write().insert(uid, Arc::clone(&tag));
        debug!(tag = uid, "created tag");
        tag
    }

    /// Look up a tag.
    pub fn get(&self, uid: u64) -> TagResult<Arc<Tag>> {
        self.tags
            .read()
            .get(&uid)
            .cloned()
            .ok_or(TagError::NotFound(uid))
    }

    /// `0` allocates a new tag, any other id must already exist.
    pub fn get_or_create(&self, uid: u64) -> TagResult<Arc<Tag>> {
        if uid == 0 {
            return Ok(self.create());
        }
        self.get(uid)
    }

    /// Increment a counter of the tag `uid`.
    pub fn increment(&self, uid: u64, field: TagField, delta: u64) -> TagResult<u64> {
        self.get(uid)?.increment(field, delta)
    }

    /// Snapshots of all tags ordered by id.
    pub fn list(&self) -> Vec<TagSnapshot> {
        let mut tags: Vec<_> = self.tags.read().values().map(|t| t.snapshot()).collect();
        tags.sort_by_key(|t| t.uid);
        tags
    }

    /// Drop a tag. Used by retention policies; uploads never remove tags.
    pub fn remove(&self, uid: u64) -> TagResult<()> {
        self.tags
            .write()
            .remove(&uid)
            .map(|_| ())
            .ok_or(TagError::NotFound(uid))
    }
}
