//! Serving of historical blob sidecar ranges to peers.
//!
//! Every inbound `blobs_sidecars_by_range` stream is answered by a [`RangeStreamHandler`]: it
//! walks the requested slots, reads the sidecars from storage and writes them to the peer as
//! individually length-delimited chunks, while throttling itself against the peer's quota in a
//! [`RangeRateLimiter`](ember_net_common::ratelimit::RangeRateLimiter).
//!
//! The [`RangeRequestService`] receives inbound streams from the transport and runs one handler
//! task per stream.
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serde support for configuration types.
//! - `test-utils`: Various utilities helpful for writing tests.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod codec;
mod config;
mod error;
mod handler;
mod message;
mod service;
mod stream;

#[cfg(any(test, feature = "test-utils"))]
/// Common helpers for network testing.
pub mod test_utils;

pub use config::{
    RangeServeConfig, BLOBS_SIDECARS_BY_RANGE_PROTOCOL, DEFAULT_BLOB_BATCH_LIMIT,
    DEFAULT_BLOB_BATCH_LIMIT_BURST_FACTOR, DEFAULT_MAX_REQUEST_BLOBS_SIDECARS,
    DEFAULT_RESP_TIMEOUT, DEFAULT_TTFB_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};
pub use error::RangeRequestError;
pub use handler::{RangeServeOutcome, RangeStreamHandler};
pub use message::{
    RangeRequest, ResponseChunk, ResponseCode, GENERIC_ERROR_MESSAGE, MAX_ERROR_MESSAGE_LEN,
    RATE_LIMITED_MESSAGE,
};
pub use service::{RangeRequestService, RangeStreamSender};
pub use stream::{FramedRpcStream, RpcStream, StreamError};
