//! Possible errors when serving range requests.

use crate::stream::StreamError;
use ember_net_common::ratelimit::RateLimitError;
use ember_primitives::Slot;
use ember_storage_api::errors::provider::ProviderError;

/// Reasons a range request stream was aborted.
#[derive(Debug, thiserror::Error)]
pub enum RangeRequestError {
    /// The peer exhausted its quota.
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    /// Reading the sidecars of a slot failed.
    #[error("could not retrieve sidecars for slot {slot}: {source}")]
    Provider {
        /// The slot that was read.
        slot: Slot,
        /// The storage error.
        #[source]
        source: ProviderError,
    },
    /// Writing a chunk to the peer failed.
    #[error("could not send sidecars for slot {slot}: {source}")]
    Stream {
        /// The slot that was being served.
        slot: Slot,
        /// The stream error.
        #[source]
        source: StreamError,
    },
    /// The request was cancelled by the caller.
    #[error("range request cancelled")]
    Cancelled,
    /// The response deadline passed.
    #[error("range request deadline exceeded")]
    DeadlineExceeded,
}

impl RangeRequestError {
    /// Returns `true` if the request was aborted because of a cancelled context rather than a
    /// protocol failure.
    pub const fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
