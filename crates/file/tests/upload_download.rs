//! End-to-end upload and download against in-memory collaborators.

mod common;

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use assert_matches::assert_matches;
use bytes::Bytes;
use common::{Harness, MIB, payload};
use proptest::prelude::*;
use vertex_file::{ErrorKind, FileError, UploadOptions};
use vertex_swarm_postage::{Batch, PostageError};
use vertex_swarm_primitives::{CHUNK_SIZE, ChunkAddress, ContentChunk, Reference};
use vertex_swarm_tags::TagStatus;

#[tokio::test]
async fn round_trip_sizes() {
    let harness = Harness::new();
    for len in [0, 1, 50, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 5 * CHUNK_SIZE + 3, 130 * CHUNK_SIZE] {
        let data = payload(len);
        let result = harness.upload(&data, &harness.options()).await.unwrap();
        assert_eq!(result.size, len as u64);

        let downloaded = harness.download(&result.reference, None).await.unwrap();
        assert_eq!(downloaded, data, "round trip of {len} bytes");
        assert_eq!(harness.length(&result.reference).await.unwrap(), len as u64);
    }
}

#[tokio::test]
async fn single_chunk_root_is_the_leaf() {
    let harness = Harness::new();
    let data = payload(100);
    let result = harness.upload(&data, &harness.options()).await.unwrap();
    let leaf = ContentChunk::new(data).unwrap();
    assert_eq!(result.reference, Reference::plain(leaf.address()));
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn stored_chunks_are_content_addressed() {
    let harness = Harness::new();
    harness
        .upload(&payload(40 * CHUNK_SIZE + 9), &harness.options())
        .await
        .unwrap();

    let store = harness.store.clone();
    let addresses = store.addresses();
    assert_eq!(addresses.len(), 41 + 1);
    for address in addresses {
        let bytes = vertex_swarm_storer::ChunkStore::get(store.as_ref(), &address)
            .await
            .unwrap();
        let chunk = ContentChunk::verified(&address, bytes.clone()).unwrap();
        assert_eq!(chunk.address(), address);
        assert!(store.stamp(&address).is_some());

        let mut mutated = bytes.to_vec();
        let last = mutated.len() - 1;
        mutated[last] ^= 0x01;
        assert!(ContentChunk::verified(&address, Bytes::from(mutated)).is_err());
    }
}

#[tokio::test]
async fn root_is_independent_of_concurrency() {
    let harness = Harness::new();
    let data = payload(300 * CHUNK_SIZE + 77);
    let serial = harness
        .uploader
        .clone()
        .with_concurrency(1)
        .upload(&vertex_file::Context::background(), &data[..], &harness.options())
        .await
        .unwrap();
    let parallel = harness
        .uploader
        .clone()
        .with_concurrency(64)
        .upload(&vertex_file::Context::background(), &data[..], &harness.options())
        .await
        .unwrap();
    assert_eq!(serial.reference, parallel.reference);
}

#[tokio::test]
async fn ten_mib_deferred_upload() {
    let harness = Harness::new();
    let data = payload(10 * MIB);
    let options = harness.options().with_deferred(true).with_pin(false);

    let result = harness.upload(&data, &options).await.unwrap();
    let tag = harness.tags.get(result.tag.unwrap()).unwrap();
    let snapshot = tag.snapshot();

    assert_eq!(snapshot.split, snapshot.stored);
    assert_eq!(snapshot.sent, 0);
    assert_eq!(snapshot.status, TagStatus::Done);
    assert_eq!(snapshot.address, Some(*result.reference.address()));
    // 2560 leaves, 20 full parents and one root over them.
    assert_eq!(snapshot.split, 2560 + 20 + 1);
    assert_eq!(harness.length(&result.reference).await.unwrap(), (10 * MIB) as u64);
}

#[tokio::test]
async fn direct_upload_without_pin_is_untracked() {
    let harness = Harness::new();
    let options = harness.options().with_deferred(false);
    let result = harness.upload(&payload(3 * CHUNK_SIZE), &options).await.unwrap();
    assert!(result.tag.is_none());
    assert!(harness.tags.list().is_empty());
}

#[tokio::test]
async fn direct_tracked_upload_counts_sent() {
    let harness = Harness::new();
    let tag = harness.tags.create();
    let options = harness.options().with_deferred(false).with_tag(tag.uid());
    harness.upload(&payload(3 * CHUNK_SIZE), &options).await.unwrap();

    let snapshot = tag.snapshot();
    assert_eq!(snapshot.split, 4);
    assert_eq!(snapshot.sent, snapshot.stored);
}

#[tokio::test]
async fn pinned_upload_pins_every_chunk() {
    let harness = Harness::new();
    let options = harness.options().with_pin(true);
    let result = harness.upload(&payload(10 * CHUNK_SIZE), &options).await.unwrap();

    let pinned = harness.pins.pinned(result.reference.address()).unwrap();
    assert_eq!(pinned.len(), harness.store.len());
}

#[tokio::test]
async fn reupload_counts_seen() {
    let harness = Harness::new();
    let data = payload(6 * CHUNK_SIZE);
    harness.upload(&data, &harness.options()).await.unwrap();
    let second = harness.upload(&data, &harness.options()).await.unwrap();

    let snapshot = harness.tags.get(second.tag.unwrap()).unwrap().snapshot();
    assert_eq!(snapshot.seen, snapshot.split);
}

#[tokio::test]
async fn download_of_missing_address() {
    let harness = Harness::new();
    let reference = Reference::plain(ChunkAddress::new([0xee; 32]));
    let err = harness.download(&reference, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(harness.length(&reference).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn length_queries() {
    let harness = Harness::new();

    let raw = ChunkAddress::new([0x11; 32]);
    harness.store.insert_raw(raw, Bytes::from(payload(50)));
    assert_eq!(harness.length(&Reference::plain(raw)).await.unwrap(), 50);

    let result = harness.upload(&payload(MIB), &harness.options()).await.unwrap();
    assert_eq!(harness.length(&result.reference).await.unwrap(), 1_048_576);
}

#[tokio::test]
async fn corrupted_small_root_fails_download() {
    let harness = Harness::new();
    let data = payload(11);
    let result = harness.upload(&data, &harness.options()).await.unwrap();

    let mut stored = ContentChunk::new(data).unwrap().to_bytes().to_vec();
    stored[10] ^= 0x01;
    harness
        .store
        .insert_raw(*result.reference.address(), Bytes::from(stored));

    let err = harness.download(&result.reference, None).await.unwrap_err();
    assert_matches!(err, FileError::Internal(_));
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn invalid_options_store_nothing() {
    let harness = Harness::new();

    let mut options = harness.options();
    options.batch_id = Default::default();
    let err = harness.upload(&payload(100), &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut options = harness.options();
    options.history_address = Some(ChunkAddress::new([1; 32]));
    let err = harness.upload(&payload(100), &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let options = harness.options().with_tag(999);
    let err = harness.upload(&payload(100), &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(harness.store.is_empty());
    assert!(harness.tags.list().is_empty());
}

#[tokio::test]
async fn unknown_or_unusable_batch() {
    let harness = Harness::new();

    let mut options = harness.options();
    options.batch_id = B256::repeat_byte(0x99);
    let err = harness.upload(&payload(100), &options).await.unwrap_err();
    assert_matches!(err, FileError::Postage(_));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(harness.store.is_empty());

    let signer = PrivateKeySigner::random();
    let inactive = B256::repeat_byte(0x42);
    let batch = Batch::builder()
        .id(inactive)
        .owner(signer.address())
        .depths(20, 16)
        .usable(false)
        .build()
        .unwrap();
    harness.ledger.insert(batch, signer).unwrap();

    let options = UploadOptions::new(inactive).with_pin(true);
    let err = harness.upload(&payload(3 * CHUNK_SIZE), &options).await.unwrap_err();
    assert_matches!(err, FileError::Postage(PostageError::BatchUnusable(id)) if id == inactive);
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(harness.store.is_empty());
    assert!(harness.tags.list().is_empty());
    assert!(harness.pins.pins().is_empty());

    // Once activated the same batch stamps normally.
    harness.ledger.activate(&inactive).unwrap();
    harness.upload(&payload(100), &UploadOptions::new(inactive)).await.unwrap();
    assert!(!harness.store.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..6 * CHUNK_SIZE)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let harness = Harness::new();
            let result = harness.upload(&data, &harness.options()).await.unwrap();
            let downloaded = harness.download(&result.reference, None).await.unwrap();
            assert_eq!(harness.length(&result.reference).await.unwrap(), downloaded.len() as u64);
            assert_eq!(downloaded, data);
        });
    }
}
