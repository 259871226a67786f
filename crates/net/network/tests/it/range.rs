//! Serving range requests with the stream handler.

use crate::{range_handler, PROTOCOL};
use assert_matches::assert_matches;
use ember_net_common::ratelimit::{RangeRateLimiter, RateLimitError, StreamIdentity};
use ember_network::{
    test_utils::{placeholder_sidecar, sidecar, RecordingStream},
    RangeRequest, RangeRequestError, RangeServeConfig, RangeServeOutcome, RangeStreamHandler,
    ResponseCode, RpcStream, StreamError, GENERIC_ERROR_MESSAGE, RATE_LIMITED_MESSAGE,
};
use ember_primitives::PeerId;
use ember_storage_api::{noop::NoopProvider, test_utils::MockStorage};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn stream() -> RecordingStream {
    RecordingStream::new(PeerId::random(), PROTOCOL)
}

#[tokio::test(start_paused = true)]
async fn serves_non_empty_slots_in_order() {
    ember_tracing::init_test_tracing();

    let storage = MockStorage::default();
    let slot_10 = vec![sidecar(10, 2, 128), sidecar(10, 1, 64)];
    let slot_13 = vec![sidecar(13, 3, 32)];
    storage.extend_sidecars(10, slot_10.clone());
    storage.extend_sidecars(13, slot_13.clone());

    let handler = range_handler(storage.clone(), RangeServeConfig::default());
    let stream = stream();
    let outcome = handler
        .handle(RangeRequest::new(10, 5), stream.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.served_slots, 2);
    assert_eq!(outcome.served_sidecars, 3);
    assert_eq!(outcome.served_bytes, (40 + 256) + (40 + 64) + (40 + 96));
    assert_eq!(storage.queried_slots(), vec![10, 11, 12, 13, 14]);

    let expected: Vec<_> = slot_10.into_iter().chain(slot_13).collect();
    assert_eq!(stream.sidecars(), expected);
    assert!(stream.error_chunks().is_empty());
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn storage_failure_aborts_with_server_error() {
    let storage = MockStorage::default();
    storage.extend_sidecars(10, [sidecar(10, 1, 8)]);
    storage.extend_sidecars(11, [sidecar(11, 1, 8)]);
    storage.extend_sidecars(13, [sidecar(13, 1, 8)]);
    storage.fail_slot(12);

    let handler = range_handler(storage.clone(), RangeServeConfig::default());
    let stream = stream();
    let err = handler
        .handle(RangeRequest::new(10, 5), stream.clone(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, RangeRequestError::Provider { slot: 12, .. });
    assert_eq!(storage.queried_slots(), vec![10, 11, 12]);
    assert_eq!(stream.sidecars().len(), 2);

    let errors = stream.error_chunks();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ResponseCode::ServerError);
    assert_eq!(errors[0].error_message().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn zero_root_sidecars_are_skipped() {
    let storage = MockStorage::default();
    let real = sidecar(12, 1, 16);
    storage.extend_sidecars(10, [placeholder_sidecar(10)]);
    storage.extend_sidecars(12, [placeholder_sidecar(12), real.clone()]);

    // slot 10 must not use up the only non-empty slot
    let config = RangeServeConfig::default().with_max_request_blobs_sidecars(1);
    let handler = range_handler(storage.clone(), config);
    let stream = stream();
    let outcome = handler
        .handle(RangeRequest::new(10, 5), stream.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.served_slots, 1);
    assert_eq!(outcome.served_sidecars, 1);
    assert_eq!(stream.sidecars(), vec![real]);
    assert_eq!(storage.queried_slots(), vec![10, 11, 12]);
}

#[tokio::test(start_paused = true)]
async fn stops_at_max_non_empty_slots() {
    let storage = MockStorage::default();
    for slot in 0..8 {
        storage.extend_sidecars(slot * 2, [sidecar(slot * 2, 1, 8)]);
    }

    let config = RangeServeConfig::default().with_max_request_blobs_sidecars(3);
    let handler = range_handler(storage.clone(), config);
    let stream = stream();
    let outcome = handler
        .handle(RangeRequest::new(0, 16), stream.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.served_slots, 3);
    assert_eq!(storage.queried_slots(), vec![0, 1, 2, 3, 4]);
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn exhausted_peer_is_rejected() {
    let storage = MockStorage::default();
    storage.extend_sidecars(5, [sidecar(5, 1, 8)]);

    let config = RangeServeConfig::default().with_blob_batch_limit(4).with_burst_factor(1);
    let handler = range_handler(storage.clone(), config);
    let stream = stream();
    handler.rate_limiter().debit(&StreamIdentity::new(stream.remote_peer(), PROTOCOL), 1);

    let err = handler
        .handle(RangeRequest::new(5, 1), stream.clone(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        RangeRequestError::RateLimited(RateLimitError::Exhausted { requested: 4, remaining: 3, .. })
    );
    assert!(storage.queried_slots().is_empty());

    let chunks = stream.chunks();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].code, ResponseCode::InvalidRequest);
    assert_eq!(chunks[0].error_message().as_deref(), Some(RATE_LIMITED_MESSAGE));
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn unknown_protocol_is_rejected() {
    let handler = range_handler(MockStorage::default(), RangeServeConfig::default());
    let stream = RecordingStream::new(PeerId::random(), "/ember/req/unknown/1/rlp");

    let err = handler
        .handle(RangeRequest::new(0, 4), stream.clone(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_matches!(err, RangeRequestError::RateLimited(RateLimitError::UnknownTopic(_)));
    assert_eq!(stream.error_chunks()[0].code, ResponseCode::InvalidRequest);
}

#[tokio::test(start_paused = true)]
async fn waits_for_quota_between_slots() {
    let storage = MockStorage::default();
    for slot in 0..3 {
        storage.extend_sidecars(slot, [sidecar(slot, 1, 8), sidecar(slot, 1, 8)]);
    }

    // two units per second, a peer may hold two units
    let config = RangeServeConfig::default().with_blob_batch_limit(2).with_burst_factor(1);
    let handler = range_handler(storage, config);
    let stream = stream();

    let start = Instant::now();
    let outcome = handler
        .handle(RangeRequest::new(0, 3), stream.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.served_sidecars, 6);
    // no wait after the last slot
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backpressure() {
    let storage = MockStorage::default();
    storage.extend_sidecars(0, [sidecar(0, 1, 8)]);
    storage.extend_sidecars(1, [sidecar(1, 1, 8)]);

    let config = RangeServeConfig::default()
        .with_blob_batch_limit(1)
        .with_burst_factor(1)
        .with_resp_timeout(Duration::from_secs(60));
    let handler = range_handler(storage.clone(), config);
    let stream = stream();
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let task = {
        let (stream, cancel) = (stream.clone(), cancel.clone());
        tokio::spawn(async move { handler.handle(RangeRequest::new(0, 2), stream, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert_matches!(err, RangeRequestError::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(stream.sidecars().len(), 1);
    assert_eq!(storage.queried_slots(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_first_slot() {
    let storage = MockStorage::default();
    storage.extend_sidecars(0, [sidecar(0, 1, 8)]);
    let handler = range_handler(storage.clone(), RangeServeConfig::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = handler.handle(RangeRequest::new(0, 1), stream(), cancel).await.unwrap_err();

    assert_matches!(err, RangeRequestError::Cancelled);
    assert!(err.is_context_error());
    assert!(storage.queried_slots().is_empty());
}

#[tokio::test(start_paused = true)]
async fn response_deadline_interrupts_backpressure() {
    let storage = MockStorage::default();
    storage.extend_sidecars(0, [sidecar(0, 1, 8)]);
    storage.extend_sidecars(1, [sidecar(1, 1, 8)]);

    // refilling takes a second, the whole response only half of it
    let config = RangeServeConfig::default()
        .with_blob_batch_limit(1)
        .with_burst_factor(1)
        .with_resp_timeout(Duration::from_millis(500));
    let handler = range_handler(storage, config);

    let err = handler
        .handle(RangeRequest::new(0, 2), stream(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_matches!(err, RangeRequestError::DeadlineExceeded);
}

#[tokio::test(start_paused = true)]
async fn write_failure_aborts_with_server_error() {
    let storage = MockStorage::default();
    storage.extend_sidecars(10, [sidecar(10, 1, 8), sidecar(10, 1, 8)]);
    storage.extend_sidecars(11, [sidecar(11, 1, 8)]);

    let handler = range_handler(storage.clone(), RangeServeConfig::default());
    let stream = stream().fail_success_writes_after(1);
    let err = handler
        .handle(RangeRequest::new(10, 2), stream.clone(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        RangeRequestError::Stream { slot: 10, source: StreamError::WriteTimeout }
    );
    assert_eq!(storage.queried_slots(), vec![10]);

    let chunks = stream.chunks();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].code.is_success());
    assert_eq!(chunks[1].error_message().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn sets_stream_deadlines() {
    let config = RangeServeConfig::default();
    let handler = range_handler(MockStorage::default(), config);
    let stream = stream();

    let start = Instant::now();
    let request = RangeRequest::new(0, 1);
    handler.handle(request, stream.clone(), CancellationToken::new()).await.unwrap();

    assert_eq!(stream.read_deadline(), Some(start + config.ttfb_timeout));
    assert_eq!(stream.write_deadline(), Some(start + config.resp_timeout));
}

#[tokio::test(start_paused = true)]
async fn empty_ranges() {
    let config = RangeServeConfig::default();
    let handler = RangeStreamHandler::new(NoopProvider::default(), config.rate_limiter(), config);

    let recording = stream();
    let outcome = handler
        .handle(RangeRequest::new(0, 64), recording.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, RangeServeOutcome::default());
    assert!(recording.chunks().is_empty());
    assert!(recording.is_closed());

    let storage = MockStorage::default();
    let handler = range_handler(storage.clone(), config);
    let outcome = handler
        .handle(RangeRequest::new(100, 0), stream(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, RangeServeOutcome::default());
    assert!(storage.queried_slots().is_empty());
}
