use crate::{
    codec::CodecError,
    message::{RangeRequest, ResponseChunk},
    stream::{RpcStream, StreamError},
};
use async_trait::async_trait;
use ember_primitives::{BlobsSidecar, PeerId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

/// An in-memory [`RpcStream`] that records every chunk written to it.
///
/// Clones share the same state, so a clone can be inspected after the original was handed to a
/// handler.
#[derive(Debug, Clone)]
pub struct RecordingStream {
    peer_id: PeerId,
    protocol: String,
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    request: Option<RangeRequest>,
    malformed_request: bool,
    reject_writes: bool,
    chunks: Vec<ResponseChunk>,
    closed: bool,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
    fail_success_writes_after: Option<usize>,
    successful_writes: usize,
}

impl RecordingStream {
    /// Creates a stream opened by `peer_id` for `protocol`.
    pub fn new(peer_id: PeerId, protocol: impl Into<String>) -> Self {
        Self { peer_id, protocol: protocol.into(), state: Default::default() }
    }

    /// Sets the request returned by [`RpcStream::read_request`].
    ///
    /// Without a request, reading fails with [`StreamError::Closed`].
    pub fn with_request(self, request: RangeRequest) -> Self {
        self.state.lock().request = Some(request);
        self
    }

    /// Lets [`RpcStream::read_request`] fail as if the peer sent a payload that does not decode.
    pub fn with_malformed_request(self) -> Self {
        self.state.lock().malformed_request = true;
        self
    }

    /// Lets every chunk write fail with [`StreamError::WriteTimeout`].
    pub fn reject_writes(self) -> Self {
        self.state.lock().reject_writes = true;
        self
    }

    /// Lets every successful chunk write after the first `n` fail with
    /// [`StreamError::WriteTimeout`]. Error chunks are still recorded.
    pub fn fail_success_writes_after(self, n: usize) -> Self {
        self.state.lock().fail_success_writes_after = Some(n);
        self
    }

    /// All chunks written so far, in order.
    pub fn chunks(&self) -> Vec<ResponseChunk> {
        self.state.lock().chunks.clone()
    }

    /// The decoded sidecars of all successful chunks, in order.
    pub fn sidecars(&self) -> Vec<BlobsSidecar> {
        self.state
            .lock()
            .chunks
            .iter()
            .filter_map(|chunk| chunk.decode_sidecar())
            .map(|sidecar| sidecar.expect("valid sidecar"))
            .collect()
    }

    /// All error chunks written so far.
    pub fn error_chunks(&self) -> Vec<ResponseChunk> {
        self.state.lock().chunks.iter().filter(|chunk| !chunk.code.is_success()).cloned().collect()
    }

    /// Returns `true` if the stream was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The last read deadline that was set.
    pub fn read_deadline(&self) -> Option<Instant> {
        self.state.lock().read_deadline
    }

    /// The last write deadline that was set.
    pub fn write_deadline(&self) -> Option<Instant> {
        self.state.lock().write_deadline
    }
}

#[async_trait]
impl RpcStream for RecordingStream {
    fn remote_peer(&self) -> PeerId {
        self.peer_id
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn set_read_deadline(&mut self, deadline: Instant) {
        self.state.lock().read_deadline = Some(deadline);
    }

    fn set_write_deadline(&mut self, deadline: Instant) {
        self.state.lock().write_deadline = Some(deadline);
    }

    async fn read_request(&mut self) -> Result<RangeRequest, StreamError> {
        let mut state = self.state.lock();
        if state.malformed_request {
            return Err(CodecError::Rlp(alloy_rlp::Error::InputTooShort).into())
        }
        state.request.take().ok_or(StreamError::Closed)
    }

    async fn write_chunk(&mut self, chunk: ResponseChunk) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StreamError::Closed)
        }
        if state.reject_writes {
            return Err(StreamError::WriteTimeout)
        }
        if chunk.code.is_success() {
            if state.fail_success_writes_after.is_some_and(|n| state.successful_writes >= n) {
                return Err(StreamError::WriteTimeout)
            }
            state.successful_writes += 1;
        }
        state.chunks.push(chunk);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.state.lock().closed = true;
        Ok(())
    }
}
