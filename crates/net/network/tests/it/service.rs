//! Dispatching streams through the request service.

use crate::{range_handler, PROTOCOL};
use ember_network::{
    test_utils::{sidecar, RecordingStream},
    RangeRequest, RangeRequestService, RangeServeConfig, ResponseCode,
};
use ember_primitives::PeerId;
use ember_storage_api::test_utils::MockStorage;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn wait_closed(stream: &RecordingStream) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !stream.is_closed() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stream closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn serves_every_incoming_stream() {
    ember_tracing::init_test_tracing();

    let storage = MockStorage::default();
    storage.extend_sidecars(1, [sidecar(1, 1, 8)]);
    storage.extend_sidecars(2, [sidecar(2, 1, 8), sidecar(2, 2, 8)]);

    let handler = Arc::new(range_handler(storage, RangeServeConfig::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    let service = RangeRequestService::new(handler, rx, CancellationToken::new());
    let service = tokio::spawn(service);

    let first =
        RecordingStream::new(PeerId::random(), PROTOCOL).with_request(RangeRequest::new(0, 2));
    let second =
        RecordingStream::new(PeerId::random(), PROTOCOL).with_request(RangeRequest::new(2, 1));
    tx.send(first.clone()).unwrap();
    tx.send(second.clone()).unwrap();

    wait_closed(&first).await;
    wait_closed(&second).await;
    assert_eq!(first.sidecars().len(), 1);
    assert_eq!(second.sidecars().len(), 2);

    // the service ends with the channel
    drop(tx);
    service.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_without_request_is_closed() {
    let handler = Arc::new(range_handler(MockStorage::default(), RangeServeConfig::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(RangeRequestService::new(handler, rx, CancellationToken::new()));

    let stream = RecordingStream::new(PeerId::random(), PROTOCOL);
    tx.send(stream.clone()).unwrap();

    wait_closed(&stream).await;
    assert!(stream.chunks().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_request_is_rejected_and_closed() {
    let handler = Arc::new(range_handler(MockStorage::default(), RangeServeConfig::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(RangeRequestService::new(handler, rx, CancellationToken::new()));

    let stream = RecordingStream::new(PeerId::random(), PROTOCOL).with_malformed_request();
    tx.send(stream.clone()).unwrap();

    wait_closed(&stream).await;
    let chunks = stream.chunks();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].code, ResponseCode::InvalidRequest);
    assert!(stream.write_deadline().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_rejection_still_closes_the_stream() {
    let handler = Arc::new(range_handler(MockStorage::default(), RangeServeConfig::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(RangeRequestService::new(handler, rx, CancellationToken::new()));

    let stream =
        RecordingStream::new(PeerId::random(), PROTOCOL).with_malformed_request().reject_writes();
    tx.send(stream.clone()).unwrap();

    wait_closed(&stream).await;
    assert!(stream.chunks().is_empty());
}
