//! Range requests over a framed byte stream.

use crate::{range_handler, PROTOCOL};
use ember_network::{
    codec::RpcClientCodec, test_utils::sidecar, FramedRpcStream, RangeRequest,
    RangeRequestService, RangeServeConfig, ResponseChunk, ResponseCode,
};
use ember_primitives::PeerId;
use ember_storage_api::test_utils::MockStorage;
use futures::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{duplex, AsyncWriteExt, DuplexStream},
    sync::mpsc,
};
use tokio_util::{codec::Framed, sync::CancellationToken};

fn spawn_service(
    storage: MockStorage,
    config: RangeServeConfig,
    cancel: CancellationToken,
) -> mpsc::UnboundedSender<FramedRpcStream<DuplexStream>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = Arc::new(range_handler(storage, config));
    tokio::spawn(RangeRequestService::new(handler, rx, cancel));
    tx
}

/// Opens a stream to the service and returns the requesting side.
fn open_stream(
    tx: &mpsc::UnboundedSender<FramedRpcStream<DuplexStream>>,
) -> Framed<DuplexStream, RpcClientCodec> {
    let (local, remote) = duplex(64 * 1024);
    tx.send(FramedRpcStream::new(local, PeerId::random(), PROTOCOL)).unwrap();
    Framed::new(remote, RpcClientCodec::default())
}

async fn read_all(client: &mut Framed<DuplexStream, RpcClientCodec>) -> Vec<ResponseChunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = client.next().await {
        chunks.push(chunk.unwrap());
    }
    chunks
}

#[tokio::test(flavor = "multi_thread")]
async fn streams_sidecars_to_client() {
    let storage = MockStorage::default();
    let expected = vec![sidecar(3, 2, 1024), sidecar(3, 1, 512), sidecar(5, 4, 256)];
    storage.extend_sidecars(3, expected[..2].to_vec());
    storage.extend_sidecars(5, expected[2..].to_vec());

    let tx = spawn_service(storage, RangeServeConfig::default(), CancellationToken::new());
    let mut client = open_stream(&tx);
    client.send(RangeRequest::new(0, 8)).await.unwrap();

    let sidecars: Vec<_> = read_all(&mut client)
        .await
        .into_iter()
        .map(|chunk| chunk.decode_sidecar().unwrap().unwrap())
        .collect();
    assert_eq!(sidecars, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_request_is_answered_with_invalid_request() {
    let config = RangeServeConfig::default();
    let tx = spawn_service(MockStorage::default(), config, CancellationToken::new());
    let mut client = open_stream(&tx);

    // a length prefixed frame that is not a valid request
    client.get_mut().write_all(&[0, 0, 0, 2, 0xff, 0x01]).await.unwrap();

    let chunks = read_all(&mut client).await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].code, ResponseCode::InvalidRequest);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_the_service_aborts_streams() {
    let storage = MockStorage::default();
    storage.extend_sidecars(0, [sidecar(0, 1, 8)]);
    storage.extend_sidecars(1, [sidecar(1, 1, 8)]);

    // after the first slot the peer has to wait a second for its quota
    let config = RangeServeConfig::default()
        .with_blob_batch_limit(1)
        .with_burst_factor(1)
        .with_resp_timeout(Duration::from_secs(120));
    let cancel = CancellationToken::new();
    let tx = spawn_service(storage, config, cancel.clone());
    let mut client = open_stream(&tx);
    client.send(RangeRequest::new(0, 2)).await.unwrap();

    let first = client.next().await.unwrap().unwrap();
    assert!(first.code.is_success());

    cancel.cancel();
    let rest = tokio::time::timeout(Duration::from_secs(5), read_all(&mut client)).await.unwrap();
    assert!(rest.is_empty());
}
