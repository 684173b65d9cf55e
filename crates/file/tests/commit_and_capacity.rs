//! Capacity enforcement, cleanup and tag accounting under concurrency.

mod common;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use common::{Harness, payload};
use vertex_file::{Context, ErrorKind};
use vertex_swarm_primitives::CHUNK_SIZE;
use vertex_swarm_tags::TagStatus;

#[tokio::test]
async fn full_bucket_fails_with_capacity() {
    // Two buckets with a single slot each: any upload of three or more chunks
    // must run out.
    let harness = Harness::with_batch(1, 1);
    let tag = harness.tags.create();
    let options = harness.options().with_tag(tag.uid()).with_pin(true);

    let err = harness
        .upload(&payload(3 * CHUNK_SIZE), &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);

    // Nothing beyond the bucket capacity was ever issued.
    assert!(harness.ledger.issued(&harness.batch_id).unwrap() <= 2);
    assert!(harness.store.len() <= 2);

    // The upload was rolled back: tag failed, no pin left behind.
    assert_eq!(tag.status(), TagStatus::Failed);
    assert!(harness.pins.pins().is_empty());
    let snapshot = tag.snapshot();
    assert!(snapshot.stored <= snapshot.split);
}

#[tokio::test]
async fn exhausted_batch_rejects_next_upload() {
    let harness = Harness::with_batch(1, 1);
    // Fill both buckets with single-chunk uploads until one fails.
    let mut stored = 0;
    for n in 0..64u8 {
        match harness.upload(&[n; 32], &harness.options()).await {
            Ok(_) => stored += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Capacity);
                break;
            }
        }
    }
    assert!((1..=2).contains(&stored));
    assert_eq!(harness.ledger.issued(&harness.batch_id).unwrap(), stored);
}

#[tokio::test]
async fn cleanup_never_deletes_chunks() {
    let harness = Harness::with_batch(2, 1);
    // Four slots in total: part of a ten-chunk upload lands before it fails.
    let err = harness
        .upload(&payload(9 * CHUNK_SIZE), &harness.options())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert!(!harness.store.is_empty());
    assert!(harness.store.len() as u64 <= harness.ledger.issued(&harness.batch_id).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_tag_counters_stay_ordered() {
    let harness = Harness::new();
    let tag = harness.tags.create();
    let done = Arc::new(AtomicBool::new(false));

    let watcher = {
        let tag = tag.clone();
        let done = done.clone();
        tokio::spawn(async move {
            while !done.load(Ordering::SeqCst) {
                let s = tag.snapshot();
                assert!(s.seen <= s.split, "{s:?}");
                assert!(s.stored <= s.split, "{s:?}");
                assert!(s.sent <= s.stored, "{s:?}");
                tokio::task::yield_now().await;
            }
        })
    };

    let uploads: Vec<_> = (0..4u8)
        .map(|i| {
            let uploader = harness.uploader.clone();
            let options = harness.options().with_deferred(false).with_tag(tag.uid());
            tokio::spawn(async move {
                let mut data = payload(50 * CHUNK_SIZE);
                data[0] = i;
                uploader
                    .upload(&Context::background(), &data[..], &options)
                    .await
            })
        })
        .collect();

    for upload in uploads {
        upload.await.unwrap().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    watcher.await.unwrap();

    let s = tag.snapshot();
    assert_eq!(s.split, 4 * 51);
    assert_eq!(s.stored, s.split);
    assert_eq!(s.sent, s.stored);
}
