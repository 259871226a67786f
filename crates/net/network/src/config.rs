//! Range serving config support.

use ember_net_common::ratelimit::{PeerRateLimiter, Rate};
use std::time::Duration;

/// Protocol id of the blob sidecars range request.
pub const BLOBS_SIDECARS_BY_RANGE_PROTOCOL: &str = "/ember/req/blobs_sidecars_by_range/1/rlp";

/// Default number of sidecars a peer may be served per second.
pub const DEFAULT_BLOB_BATCH_LIMIT: u64 = 64;

/// Default multiple of the batch limit a peer may burst to.
pub const DEFAULT_BLOB_BATCH_LIMIT_BURST_FACTOR: u64 = 2;

/// Default maximum number of non-empty slots served for a single request.
pub const DEFAULT_MAX_REQUEST_BLOBS_SIDECARS: u64 = 128;

/// Default time to first byte.
pub const DEFAULT_TTFB_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for answering a whole request.
pub const DEFAULT_RESP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for writing a single response chunk.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for serving range requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RangeServeConfig {
    /// Sidecars a peer may be served per second, checked before every slot.
    pub blob_batch_limit: u64,
    /// Multiple of `blob_batch_limit` below which the handler waits for the peer's quota to
    /// refill before serving the next slot.
    pub blob_batch_limit_burst_factor: u64,
    /// Maximum number of non-empty slots served per request.
    pub max_request_blobs_sidecars: u64,
    /// Read deadline for the stream.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub ttfb_timeout: Duration,
    /// Deadline for the whole response.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub resp_timeout: Duration,
    /// Write deadline for every single chunk.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub write_timeout: Duration,
}

impl Default for RangeServeConfig {
    fn default() -> Self {
        Self {
            blob_batch_limit: DEFAULT_BLOB_BATCH_LIMIT,
            blob_batch_limit_burst_factor: DEFAULT_BLOB_BATCH_LIMIT_BURST_FACTOR,
            max_request_blobs_sidecars: DEFAULT_MAX_REQUEST_BLOBS_SIDECARS,
            ttfb_timeout: DEFAULT_TTFB_TIMEOUT,
            resp_timeout: DEFAULT_RESP_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl RangeServeConfig {
    /// Quota a peer must have left to be served the next slot without waiting.
    pub const fn burst_units(&self) -> u64 {
        self.blob_batch_limit.saturating_mul(self.blob_batch_limit_burst_factor)
    }

    /// Returns a rate limiter for the range protocol that matches this config.
    ///
    /// Peers are refilled at `blob_batch_limit` per second and may hold up to
    /// [`burst_units`](Self::burst_units).
    pub fn rate_limiter(&self) -> PeerRateLimiter {
        PeerRateLimiter::new().with_topic(
            BLOBS_SIDECARS_BY_RANGE_PROTOCOL,
            Rate::per_second(self.blob_batch_limit.max(1)),
            self.burst_units(),
        )
    }

    /// Sets the per second batch limit.
    pub const fn with_blob_batch_limit(mut self, limit: u64) -> Self {
        self.blob_batch_limit = limit;
        self
    }

    /// Sets the burst factor.
    pub const fn with_burst_factor(mut self, factor: u64) -> Self {
        self.blob_batch_limit_burst_factor = factor;
        self
    }

    /// Sets the maximum number of non-empty slots per request.
    pub const fn with_max_request_blobs_sidecars(mut self, max: u64) -> Self {
        self.max_request_blobs_sidecars = max;
        self
    }

    /// Sets the response deadline.
    pub const fn with_resp_timeout(mut self, timeout: Duration) -> Self {
        self.resp_timeout = timeout;
        self
    }
}
