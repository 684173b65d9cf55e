//! History-backed access controller.

use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{B256, hex, keccak256};
use async_trait::async_trait;
use tracing::debug;
use vertex_swarm_primitives::{ChunkAddress, ContentChunk, EncryptionKey, KEY_SIZE, Reference};
use vertex_swarm_storer::{ChunkStore, StorerError};

use crate::{
    error::{ActError, ActResult, PutError},
    history::HistoryEntry,
};

/// Sink for chunks produced while granting access.
///
/// The upload path passes its own session here so history chunks are
/// stamped, stored and counted like any other chunk of the upload.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait Putter: Send + Sync {
    async fn put(&self, chunk: ContentChunk) -> Result<(), PutError>;
}

/// 32-byte secret from which per-entry access keys are derived.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GrantKey([u8; KEY_SIZE]);

impl GrantKey {
    pub fn new(bytes: [u8; KEY_SIZE]) -> ActResult<Self> {
        if bytes == [0u8; KEY_SIZE] {
            return Err(ActError::InvalidGrantKey("key is zero"));
        }
        Ok(Self(bytes))
    }

    pub fn from_slice(slice: &[u8]) -> ActResult<Self> {
        let bytes: [u8; KEY_SIZE] = slice
            .try_into()
            .map_err(|_| ActError::InvalidGrantKey("key must be 32 bytes"))?;
        Self::new(bytes)
    }

    /// Access key for the entry created at `timestamp`.
    fn access_key(&self, timestamp: u64) -> EncryptionKey {
        let mut input = [0u8; KEY_SIZE + 8];
        input[..KEY_SIZE].copy_from_slice(&self.0);
        input[KEY_SIZE..].copy_from_slice(&timestamp.to_be_bytes());
        EncryptionKey::new(keccak256(input).0)
    }
}

impl FromStr for GrantKey {
    type Err = ActError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ActError::InvalidGrantKey("not hex"))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GrantKey(..)")
    }
}

/// Outcome of wrapping a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// Address of the newest history entry.
    pub history_address: ChunkAddress,
    /// The reference, encrypted under the entry's access key.
    pub encrypted_reference: Reference,
    /// Entry timestamp, which selects the access key.
    pub timestamp: u64,
}

/// Wraps references so that only grant holders can resolve them.
#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait AccessController: Send + Sync {
    /// Encrypt `reference` and append a grant entry, extending `history`
    /// when given or starting a new chain otherwise.
    async fn encrypt(
        &self,
        putter: &dyn Putter,
        getter: &dyn ChunkStore,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> ActResult<AccessGrant>;

    /// Recover the reference behind `encrypted` from the chain at `history`.
    async fn decrypt(
        &self,
        getter: &dyn ChunkStore,
        encrypted: &Reference,
        history: &ChunkAddress,
    ) -> ActResult<Reference>;
}

/// [`AccessController`] keyed by a single publisher secret.
#[derive(Debug, Clone)]
pub struct HistoryController {
    secret: GrantKey,
}

impl HistoryController {
    pub fn new(secret: GrantKey) -> Self {
        Self { secret }
    }

    fn transform(&self, reference: &Reference, timestamp: u64) -> ActResult<Reference> {
        let mut bytes = reference.to_vec();
        self.secret
            .access_key(timestamp)
            .apply_keystream(&mut bytes, 0);
        Ok(Reference::from_slice(&bytes)?)
    }
}

async fn load_entry(getter: &dyn ChunkStore, address: &ChunkAddress) -> ActResult<HistoryEntry> {
    let data = getter.get(address).await.map_err(|e| match e {
        StorerError::NotFound(addr) => ActError::HistoryNotFound(addr),
        other => ActError::Store(other),
    })?;
    let chunk = ContentChunk::verified(address, data)
        .map_err(|_| ActError::MalformedHistory("history chunk fails verification"))?;
    HistoryEntry::decode(chunk.payload())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl AccessController for HistoryController {
    async fn encrypt(
        &self,
        putter: &dyn Putter,
        getter: &dyn ChunkStore,
        reference: &Reference,
        history: Option<&ChunkAddress>,
    ) -> ActResult<AccessGrant> {
        let mut timestamp = unix_now();
        if let Some(previous) = history {
            let head = load_entry(getter, previous).await?;
            // Keys are per timestamp, so entries in one chain must not share one.
            timestamp = timestamp.max(head.timestamp().saturating_add(1));
        }

        let encrypted_reference = self.transform(reference, timestamp)?;
        let entry = HistoryEntry::new(timestamp, history.copied(), encrypted_reference.clone());
        let chunk = entry.to_chunk()?;
        let history_address = chunk.address();
        putter.put(chunk).await.map_err(ActError::Put)?;

        debug!(%history_address, timestamp, extended = history.is_some(), "access granted");
        Ok(AccessGrant {
            history_address,
            encrypted_reference,
            timestamp,
        })
    }

    async fn decrypt(
        &self,
        getter: &dyn ChunkStore,
        encrypted: &Reference,
        history: &ChunkAddress,
    ) -> ActResult<Reference> {
        let mut next = Some(*history);
        while let Some(address) = next {
            let entry = load_entry(getter, &address).await?;
            if entry.encrypted_reference() == encrypted {
                return self.transform(encrypted, entry.timestamp());
            }
            next = entry.previous().copied();
        }
        Err(ActError::EntryNotFound)
    }
}

impl From<B256> for GrantKey {
    fn from(value: B256) -> Self {
        Self(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vertex_swarm_storer::MemoryChunkStore;

    struct RawPutter<'a>(&'a MemoryChunkStore);

    #[async_trait]
    impl Putter for RawPutter<'_> {
        async fn put(&self, chunk: ContentChunk) -> Result<(), PutError> {
            self.0.insert_raw(chunk.address(), chunk.to_bytes());
            Ok(())
        }
    }

    struct FailingPutter;

    #[async_trait]
    impl Putter for FailingPutter {
        async fn put(&self, _chunk: ContentChunk) -> Result<(), PutError> {
            Err("store offline".into())
        }
    }

    fn controller() -> HistoryController {
        HistoryController::new(GrantKey::new([7u8; 32]).unwrap())
    }

    fn reference(byte: u8) -> Reference {
        Reference::plain(ChunkAddress::new([byte; 32]))
    }

    #[test]
    fn test_grant_key_validation() {
        assert_matches!(GrantKey::new([0u8; 32]), Err(ActError::InvalidGrantKey(_)));
        assert_matches!(GrantKey::from_slice(&[1u8; 16]), Err(ActError::InvalidGrantKey(_)));
        assert_matches!("zz".parse::<GrantKey>(), Err(ActError::InvalidGrantKey(_)));
        assert!(format!("{:x}", B256::repeat_byte(3)).parse::<GrantKey>().is_ok());
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt() {
        let store = MemoryChunkStore::new();
        let act = controller();
        let plain = reference(1);

        let grant = act
            .encrypt(&RawPutter(&store), &store, &plain, None)
            .await
            .unwrap();
        assert_ne!(grant.encrypted_reference, plain);
        assert_eq!(grant.encrypted_reference.size(), plain.size());
        assert!(store.addresses().contains(&grant.history_address));

        let decrypted = act
            .decrypt(&store, &grant.encrypted_reference, &grant.history_address)
            .await
            .unwrap();
        assert_eq!(decrypted, plain);
    }

    #[tokio::test]
    async fn test_extend_chain_and_decrypt_older_entry() {
        let store = MemoryChunkStore::new();
        let act = controller();

        let first = act
            .encrypt(&RawPutter(&store), &store, &reference(1), None)
            .await
            .unwrap();
        let second = act
            .encrypt(
                &RawPutter(&store),
                &store,
                &reference(2),
                Some(&first.history_address),
            )
            .await
            .unwrap();
        assert!(second.timestamp > first.timestamp);

        // The older grant resolves through the newer head.
        let decrypted = act
            .decrypt(&store, &first.encrypted_reference, &second.history_address)
            .await
            .unwrap();
        assert_eq!(decrypted, reference(1));
    }

    #[tokio::test]
    async fn test_missing_history() {
        let store = MemoryChunkStore::new();
        let missing = ChunkAddress::new([9u8; 32]);
        let err = controller()
            .encrypt(&RawPutter(&store), &store, &reference(1), Some(&missing))
            .await
            .unwrap_err();
        assert_matches!(err, ActError::HistoryNotFound(addr) if addr == missing);
    }

    #[tokio::test]
    async fn test_malformed_history() {
        let store = MemoryChunkStore::new();
        let chunk = ContentChunk::new(&b"not a history entry"[..]).unwrap();
        store.insert_raw(chunk.address(), chunk.to_bytes());

        let err = controller()
            .encrypt(&RawPutter(&store), &store, &reference(1), Some(&chunk.address()))
            .await
            .unwrap_err();
        assert_matches!(err, ActError::MalformedHistory(_));
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let store = MemoryChunkStore::new();
        let act = controller();
        let grant = act
            .encrypt(&RawPutter(&store), &store, &reference(1), None)
            .await
            .unwrap();
        let err = act
            .decrypt(&store, &reference(5), &grant.history_address)
            .await
            .unwrap_err();
        assert_matches!(err, ActError::EntryNotFound);
    }

    #[tokio::test]
    async fn test_put_failure_surfaces() {
        let store = MemoryChunkStore::new();
        let err = controller()
            .encrypt(&FailingPutter, &store, &reference(1), None)
            .await
            .unwrap_err();
        assert_matches!(err, ActError::Put(_));
    }
}
