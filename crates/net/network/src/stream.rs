//! Abstraction over a single inbound request stream.

use crate::{
    codec::{CodecError, RpcCodec},
    message::{RangeRequest, ResponseChunk},
};
use async_trait::async_trait;
use ember_primitives::PeerId;
use futures::{SinkExt, StreamExt};
use std::future::Future;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::{timeout_at, Instant},
};
use tokio_util::codec::Framed;

/// Errors of an [`RpcStream`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The read deadline passed.
    #[error("read deadline exceeded")]
    ReadTimeout,
    /// The write deadline passed.
    #[error("write deadline exceeded")]
    WriteTimeout,
    /// The stream was closed.
    #[error("stream closed")]
    Closed,
    /// Framing failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A bidirectional stream opened by a remote peer for a single request.
#[async_trait]
pub trait RpcStream: Send {
    /// The peer that opened the stream.
    fn remote_peer(&self) -> PeerId;

    /// The protocol id the stream was opened for.
    fn protocol(&self) -> &str;

    /// Deadline for all following reads.
    fn set_read_deadline(&mut self, deadline: Instant);

    /// Deadline for all following writes.
    fn set_write_deadline(&mut self, deadline: Instant);

    /// Reads the request of the stream.
    async fn read_request(&mut self) -> Result<RangeRequest, StreamError>;

    /// Writes a single response chunk.
    async fn write_chunk(&mut self, chunk: ResponseChunk) -> Result<(), StreamError>;

    /// Flushes and closes the stream. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), StreamError>;
}

/// An [`RpcStream`] over any async byte stream, framed with [`RpcCodec`].
#[derive(Debug)]
pub struct FramedRpcStream<T> {
    inner: Framed<T, RpcCodec>,
    peer_id: PeerId,
    protocol: String,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
    closed: bool,
}

impl<T> FramedRpcStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps the io stream opened by `peer_id` for `protocol`.
    pub fn new(io: T, peer_id: PeerId, protocol: impl Into<String>) -> Self {
        Self {
            inner: Framed::new(io, RpcCodec::default()),
            peer_id,
            protocol: protocol.into(),
            read_deadline: None,
            write_deadline: None,
            closed: false,
        }
    }

    /// Returns the underlying io stream.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Runs `fut` until the optional deadline.
async fn with_deadline<F, O>(
    deadline: Option<Instant>,
    fut: F,
    err: StreamError,
) -> Result<O, StreamError>
where
    F: Future<Output = O>,
{
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.map_err(|_| err),
        None => Ok(fut.await),
    }
}

#[async_trait]
impl<T> RpcStream for FramedRpcStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn remote_peer(&self) -> PeerId {
        self.peer_id
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn set_read_deadline(&mut self, deadline: Instant) {
        self.read_deadline = Some(deadline);
    }

    fn set_write_deadline(&mut self, deadline: Instant) {
        self.write_deadline = Some(deadline);
    }

    async fn read_request(&mut self) -> Result<RangeRequest, StreamError> {
        if self.closed {
            return Err(StreamError::Closed)
        }
        let next =
            with_deadline(self.read_deadline, self.inner.next(), StreamError::ReadTimeout).await?;
        match next {
            Some(request) => Ok(request?),
            None => Err(StreamError::Closed),
        }
    }

    async fn write_chunk(&mut self, chunk: ResponseChunk) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed)
        }
        with_deadline(self.write_deadline, self.inner.send(chunk), StreamError::WriteTimeout)
            .await??;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Ok(())
        }
        self.closed = true;
        with_deadline(
            self.write_deadline,
            SinkExt::<ResponseChunk>::close(&mut self.inner),
            StreamError::WriteTimeout,
        )
        .await??;
        Ok(())
    }
}
