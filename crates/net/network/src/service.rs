//! Dispatches inbound range request streams to handler tasks.

use crate::{
    handler::RangeStreamHandler,
    message::{ResponseChunk, ResponseCode},
    stream::{RpcStream, StreamError},
};
use ember_net_common::ratelimit::RangeRateLimiter;
use ember_storage_api::SidecarReader;
use futures::StreamExt;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    time::Instant,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sender half the transport uses to hand inbound streams to the [`RangeRequestService`].
pub type RangeStreamSender<S> = UnboundedSender<S>;

/// Serves every inbound range request stream on its own task.
///
/// This future resolves once the channel of incoming streams is closed. Cancelling the
/// service's token aborts all requests in flight.
#[derive(Debug)]
#[must_use = "Service does nothing unless polled."]
pub struct RangeRequestService<P, L, S> {
    /// The handler shared by all stream tasks.
    handler: Arc<RangeStreamHandler<P, L>>,
    /// Incoming streams from the transport.
    incoming_streams: UnboundedReceiverStream<S>,
    /// Parent of the tokens handed to every request.
    cancel: CancellationToken,
}

// === impl RangeRequestService ===

impl<P, L, S> RangeRequestService<P, L, S> {
    /// Create a new instance
    pub fn new(
        handler: Arc<RangeStreamHandler<P, L>>,
        incoming: UnboundedReceiver<S>,
        cancel: CancellationToken,
    ) -> Self {
        Self { handler, incoming_streams: UnboundedReceiverStream::new(incoming), cancel }
    }

    /// The handler streams are served with.
    pub const fn handler(&self) -> &Arc<RangeStreamHandler<P, L>> {
        &self.handler
    }
}

impl<P, L, S> RangeRequestService<P, L, S>
where
    P: SidecarReader + 'static,
    L: RangeRateLimiter + 'static,
    S: RpcStream + 'static,
{
    fn on_incoming_stream(&self, stream: S) {
        let handler = Arc::clone(&self.handler);
        let cancel = self.cancel.child_token();
        tokio::spawn(serve_stream(handler, stream, cancel));
    }
}

/// Reads the request of the stream and serves it.
async fn serve_stream<P, L, S>(
    handler: Arc<RangeStreamHandler<P, L>>,
    mut stream: S,
    cancel: CancellationToken,
) where
    P: SidecarReader,
    L: RangeRateLimiter,
    S: RpcStream,
{
    let peer_id = stream.remote_peer();
    let config = handler.config();
    stream.set_read_deadline(Instant::now() + config.ttfb_timeout);

    let request = match stream.read_request().await {
        Ok(request) => request,
        Err(err) => {
            debug!(target: "net::range", %peer_id, %err, "Failed to read range request");
            if matches!(err, StreamError::Codec(_)) {
                stream.set_write_deadline(Instant::now() + config.write_timeout);
                let chunk = ResponseChunk::error(ResponseCode::InvalidRequest, &err.to_string());
                if let Err(err) = stream.write_chunk(chunk).await {
                    debug!(target: "net::range", %peer_id, %err, "Could not write error response");
                }
            }
            if let Err(err) = stream.close().await {
                debug!(target: "net::range", %peer_id, %err, "Could not close stream");
            }
            return
        }
    };

    if let Err(err) = handler.handle(request, stream, cancel).await {
        debug!(
            target: "net::range",
            %peer_id,
            start_slot = request.start_slot,
            count = request.count,
            %err,
            "Failed to serve range request"
        );
    }
}

impl<P, L, S> Future for RangeRequestService<P, L, S>
where
    P: SidecarReader + 'static,
    L: RangeRateLimiter + 'static,
    S: RpcStream + 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match this.incoming_streams.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Ready(Some(stream)) => this.on_incoming_stream(stream),
            }
        }
    }
}
