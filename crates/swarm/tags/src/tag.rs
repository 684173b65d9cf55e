//! A single upload session.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use strum::{Display, EnumString, IntoStaticStr};
use vertex_swarm_primitives::ChunkAddress;

use crate::error::{TagError, TagResult};

/// Progress counters of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TagField {
    /// Chunks produced by the splitter.
    Split,
    /// Chunks that were already present in the store.
    Seen,
    /// Chunks acknowledged by the store.
    Stored,
    /// Chunks handed on for network propagation.
    Sent,
    /// Chunks confirmed by the network.
    Synced,
}

impl TagField {
    /// The counter this one must never exceed.
    fn bound(self) -> Option<TagField> {
        match self {
            Self::Split => None,
            Self::Seen | Self::Stored => Some(Self::Split),
            Self::Sent => Some(Self::Stored),
            Self::Synced => Some(Self::Sent),
        }
    }
}

/// Lifecycle of the upload a tag tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TagStatus {
    /// Chunks are still being stored.
    Staging,
    /// The upload committed under a root address.
    Done,
    /// The upload was aborted.
    Failed,
}

#[derive(Debug)]
struct TagState {
    status: TagStatus,
    address: Option<ChunkAddress>,
}

/// Progress record for one upload.
///
/// Counters only grow. `stored <= split` and `sent <= stored` hold at every
/// point because each bounded increment is a compare-and-swap against the
/// current value of its bound, and bounds never decrease.
#[derive(Debug)]
pub struct Tag {
    uid: u64,
    started_at: u64,
    split: AtomicU64,
    seen: AtomicU64,
    stored: AtomicU64,
    sent: AtomicU64,
    synced: AtomicU64,
    state: Mutex<TagState>,
}

impl Tag {
    pub(crate) fn new(uid: u64) -> Self {
        Self {
            uid,
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            split: AtomicU64::new(0),
            seen: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            synced: AtomicU64::new(0),
            state: Mutex::new(TagState {
                status: TagStatus::Staging,
                address: None,
            }),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    fn counter(&self, field: TagField) -> &AtomicU64 {
        match field {
            TagField::Split => &self.split,
            TagField::Seen => &self.seen,
            TagField::Stored => &self.stored,
            TagField::Sent => &self.sent,
            TagField::Synced => &self.synced,
        }
    }

    /// Current value of one counter.
    pub fn get(&self, field: TagField) -> u64 {
        self.counter(field).load(Ordering::SeqCst)
    }

    /// Add `delta` to `field`, returning the new value.
    ///
    /// Fails without changing anything if the result would exceed the
    /// counter's bound.
    pub fn increment(&self, field: TagField, delta: u64) -> TagResult<u64> {
        let counter = self.counter(field);
        let Some(bound) = field.bound() else {
            return Ok(counter.fetch_add(delta, Ordering::SeqCst).saturating_add(delta));
        };

        let limit_counter = self.counter(bound);
        let mut limit = 0;
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                limit = limit_counter.load(Ordering::SeqCst);
                value
                    .checked_add(delta)
                    .filter(|next| *next <= limit)
            })
            .map(|prev| prev + delta)
            .map_err(|value| TagError::Bound {
                field,
                bound,
                value,
                delta,
                limit,
            })
    }

    /// Consistent view of all counters.
    ///
    /// Counters are read from the most constrained to the least, so the
    /// snapshot satisfies the same ordering as the live tag.
    pub fn snapshot(&self) -> TagSnapshot {
        let synced = self.get(TagField::Synced);
        let sent = self.get(TagField::Sent);
        let stored = self.get(TagField::Stored);
        let seen = self.get(TagField::Seen);
        let split = self.get(TagField::Split);
        let state = self.state.lock();

        TagSnapshot {
            uid: self.uid,
            started_at: self.started_at,
            split,
            seen,
            stored,
            sent,
            synced,
            status: state.status,
            address: state.address,
        }
    }

    pub fn status(&self) -> TagStatus {
        self.state.lock().status
    }

    /// Root address recorded on completion.
    pub fn address(&self) -> Option<ChunkAddress> {
        self.state.lock().address
    }

    /// Record completion under `address`. Returns false if already terminal.
    pub fn done(&self, address: ChunkAddress) -> bool {
        let mut state = self.state.lock();
        if state.status != TagStatus::Staging {
            return false;
        }
        state.status = TagStatus::Done;
        state.address = Some(address);
        true
    }

    /// Mark the upload as aborted. Returns false if already terminal.
    pub fn fail(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != TagStatus::Staging {
            return false;
        }
        state.status = TagStatus::Failed;
        true
    }
}

/// Point-in-time copy of a [`Tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSnapshot {
    pub uid: u64,
    /// Unix seconds at creation.
    pub started_at: u64,
    pub split: u64,
    pub seen: u64,
    pub stored: u64,
    pub sent: u64,
    pub synced: u64,
    pub status: TagStatus,
    pub address: Option<ChunkAddress>,
}
