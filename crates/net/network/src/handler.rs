//! Serves a single `blobs_sidecars_by_range` stream.

use crate::{
    config::RangeServeConfig,
    error::RangeRequestError,
    message::{
        RangeRequest, ResponseChunk, ResponseCode, GENERIC_ERROR_MESSAGE, RATE_LIMITED_MESSAGE,
    },
    stream::RpcStream,
};
use ember_net_common::{
    cost::estimate_sidecar_cost,
    ratelimit::{RangeRateLimiter, StreamIdentity, TopicQuota},
};
use ember_primitives::Slot;
use ember_storage_api::SidecarReader;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, field, trace, Instrument};

/// Counters of a successfully served request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeServeOutcome {
    /// Number of slots for which at least one sidecar was sent.
    pub served_slots: u64,
    /// Number of sidecars sent.
    pub served_sidecars: u64,
    /// Estimated cost of all sent sidecars, see [`estimate_sidecar_cost`].
    pub served_bytes: u64,
}

/// Answers range requests from storage while throttling itself against the requesting peer's
/// quota.
///
/// The handler is shared by all streams, every call to [`handle`](Self::handle) serves exactly
/// one stream and consumes it.
#[derive(Debug)]
pub struct RangeStreamHandler<P, L> {
    provider: P,
    rate_limiter: L,
    config: RangeServeConfig,
}

impl<P, L> RangeStreamHandler<P, L> {
    /// Creates a new handler.
    pub const fn new(provider: P, rate_limiter: L, config: RangeServeConfig) -> Self {
        Self { provider, rate_limiter, config }
    }

    /// The config of the handler.
    pub const fn config(&self) -> &RangeServeConfig {
        &self.config
    }

    /// The rate limiter of the handler.
    pub const fn rate_limiter(&self) -> &L {
        &self.rate_limiter
    }
}

impl<P, L> RangeStreamHandler<P, L>
where
    P: SidecarReader,
    L: RangeRateLimiter,
{
    /// Streams the sidecars of all slots in the requested range to the peer.
    ///
    /// Slots without sidecars are skipped and do not count towards
    /// [`max_request_blobs_sidecars`](RangeServeConfig::max_request_blobs_sidecars). Before every
    /// slot the peer's budget is checked, after every non-empty slot the peer is charged for the
    /// sent sidecars and, if its remaining quota dropped below the burst threshold, the handler
    /// waits for the quota to refill.
    ///
    /// Fatal errors that are the peer's or our fault are answered with an error chunk before the
    /// stream is closed. The whole call is bounded by
    /// [`resp_timeout`](RangeServeConfig::resp_timeout) and aborts early once `cancel` fires.
    pub async fn handle<S>(
        &self,
        request: RangeRequest,
        mut stream: S,
        cancel: CancellationToken,
    ) -> Result<RangeServeOutcome, RangeRequestError>
    where
        S: RpcStream,
    {
        let span = debug_span!(
            target: "net::range",
            "blobs_sidecars_by_range",
            peer_id = %stream.remote_peer(),
            start_slot = request.start_slot,
            count = request.count,
            error = field::Empty,
        );

        let result = self.serve(request, &mut stream, &cancel).instrument(span.clone()).await;
        match &result {
            Ok(outcome) => span.in_scope(|| {
                debug!(
                    target: "net::range",
                    served_slots = outcome.served_slots,
                    served_sidecars = outcome.served_sidecars,
                    "Served range request"
                )
            }),
            Err(err) => {
                span.record("error", field::display(err));
            }
        }
        result
    }

    async fn serve<S>(
        &self,
        request: RangeRequest,
        stream: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RangeServeOutcome, RangeRequestError>
    where
        S: RpcStream,
    {
        let now = Instant::now();
        let deadline = now + self.config.resp_timeout;
        stream.set_read_deadline(now + self.config.ttfb_timeout);
        stream.set_write_deadline(deadline);

        let identity = StreamIdentity::new(stream.remote_peer(), stream.protocol());
        let end_slot = request.end_slot();
        let mut outcome = RangeServeOutcome::default();

        for slot in request.start_slot..end_slot {
            if outcome.served_slots >= self.config.max_request_blobs_sidecars {
                trace!(target: "net::range", %slot, "Reached maximum number of served slots");
                break
            }
            ensure_active(cancel, deadline)?;

            let budget = self.rate_limiter.check_budget(&identity, self.config.blob_batch_limit);
            if let Err(err) = budget {
                debug!(target: "net::range", %slot, %err, "Peer exceeded its quota");
                let code = ResponseCode::InvalidRequest;
                self.write_error_response(stream, code, RATE_LIMITED_MESSAGE).await;
                return Err(err.into())
            }

            let sidecars = match self.provider.blobs_sidecars_by_slot(slot) {
                Ok(sidecars) => sidecars,
                Err(source) => {
                    self.write_server_error(stream).await;
                    return Err(RangeRequestError::Provider { slot, source })
                }
            };

            let mut written = 0u64;
            for sidecar in sidecars.iter().filter(|sidecar| !sidecar.is_placeholder()) {
                stream.set_write_deadline(Instant::now() + self.config.write_timeout);
                if let Err(source) = stream.write_chunk(ResponseChunk::success(sidecar)).await {
                    debug!(target: "net::range", %slot, %source, "Could not send sidecar");
                    self.write_server_error(stream).await;
                    return Err(RangeRequestError::Stream { slot, source })
                }
                written += 1;
                outcome.served_bytes += estimate_sidecar_cost(sidecar) as u64;
            }

            if written == 0 {
                continue
            }
            outcome.served_slots += 1;
            outcome.served_sidecars += written;
            self.rate_limiter.debit(&identity, written);

            if slot.saturating_add(1) >= end_slot {
                break
            }
            self.throttle(&identity, slot, cancel, deadline).await?;
        }

        if let Err(err) = stream.close().await {
            debug!(target: "net::range", %err, "Could not close stream");
        }
        Ok(outcome)
    }

    /// Waits for the peer's quota to refill if it dropped below the burst threshold.
    async fn throttle(
        &self,
        identity: &StreamIdentity,
        slot: Slot,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<(), RangeRequestError> {
        let quota = self.rate_limiter.topic_quota(&identity.protocol)?;
        let key = identity.key();
        let remaining = quota.remaining(&key);
        if i128::from(remaining) >= i128::from(self.config.burst_units()) {
            return Ok(())
        }

        let wait = quota.time_until_refill(&key);
        trace!(target: "net::range", %slot, remaining, ?wait, "Waiting for quota to refill");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RangeRequestError::Cancelled),
            _ = sleep_until(deadline) => Err(RangeRequestError::DeadlineExceeded),
            _ = sleep(wait) => Ok(()),
        }
    }

    /// Answers with the generic server error, the cause is never exposed to the peer.
    async fn write_server_error<S: RpcStream>(&self, stream: &mut S) {
        self.write_error_response(stream, ResponseCode::ServerError, GENERIC_ERROR_MESSAGE).await
    }

    /// Writes a single error chunk and closes the stream.
    async fn write_error_response<S>(&self, stream: &mut S, code: ResponseCode, message: &str)
    where
        S: RpcStream,
    {
        stream.set_write_deadline(Instant::now() + self.config.write_timeout);
        if let Err(err) = stream.write_chunk(ResponseChunk::error(code, message)).await {
            debug!(target: "net::range", %err, "Could not write error response");
        }
        if let Err(err) = stream.close().await {
            debug!(target: "net::range", %err, "Could not close stream");
        }
    }
}

/// Checks whether the request may go on.
fn ensure_active(cancel: &CancellationToken, deadline: Instant) -> Result<(), RangeRequestError> {
    if cancel.is_cancelled() {
        return Err(RangeRequestError::Cancelled)
    }
    if Instant::now() >= deadline {
        return Err(RangeRequestError::DeadlineExceeded)
    }
    Ok(())
}
