//! Pinning of uploaded content.
//!
//! An upload stages the addresses it stores in a [`PinCollection`]. The
//! collection becomes a pin only when committed under the root address;
//! aborting or dropping it leaves no trace.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use vertex_swarm_primitives::ChunkAddress;

/// Registry of pinned roots and the chunks they retain.
#[derive(Debug, Clone, Default)]
pub struct PinStore {
    pins: Arc<RwLock<HashMap<ChunkAddress, Arc<[ChunkAddress]>>>>,
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a staged collection.
    pub fn stage(&self) -> PinCollection {
        PinCollection {
            store: self.clone(),
            addresses: Mutex::new(Vec::new()),
        }
    }

    /// Pinned root addresses.
    pub fn pins(&self) -> Vec<ChunkAddress> {
        let mut roots: Vec<_> = self.pins.read().keys().copied().collect();
        roots.sort_unstable();
        roots
    }

    /// Chunks retained by the pin on `root`.
    pub fn pinned(&self, root: &ChunkAddress) -> Option<Arc<[ChunkAddress]>> {
        self.pins.read().get(root).cloned()
    }

    /// Whether `address` is retained by any pin.
    pub fn is_pinned(&self, address: &ChunkAddress) -> bool {
        self.pins
            .read()
            .values()
            .any(|chunks| chunks.contains(address))
    }

    /// Remove the pin on `root`. Returns false if there was none.
    pub fn unpin(&self, root: &ChunkAddress) -> bool {
        self.pins.write().remove(root).is_some()
    }
}

/// Addresses staged for a pin that does not exist yet.
#[derive(Debug)]
pub struct PinCollection {
    store: PinStore,
    addresses: Mutex<Vec<ChunkAddress>>,
}

impl PinCollection {
    pub fn add(&self, address: ChunkAddress) {
        self.addresses.lock().push(address);
    }

    pub fn len(&self) -> usize {
        self.addresses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.lock().is_empty()
    }

    /// Turn the staged addresses into a pin on `root`.
    pub fn commit(self, root: ChunkAddress) {
        let mut addresses = std::mem::take(&mut *self.addresses.lock());
        addresses.sort_unstable();
        addresses.dedup();
        debug!(%root, chunks = addresses.len(), "pinned");
        self.store.pins.write().insert(root, addresses.into());
    }

    /// Discard the staged addresses.
    pub fn abort(self) {
        debug!(chunks = self.len(), "discarded staged pin");
    }
}
