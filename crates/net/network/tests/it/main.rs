//! Root module for test modules, so that the tests are built into a single binary.

mod framed;
mod range;
mod service;

const fn main() {}

use ember_network::{RangeServeConfig, RangeStreamHandler, BLOBS_SIDECARS_BY_RANGE_PROTOCOL};
use ember_net_common::ratelimit::PeerRateLimiter;
use ember_storage_api::test_utils::MockStorage;

/// Returns a handler serving from `storage` with a limiter that matches `config`.
fn range_handler(
    storage: MockStorage,
    config: RangeServeConfig,
) -> RangeStreamHandler<MockStorage, PeerRateLimiter> {
    RangeStreamHandler::new(storage, config.rate_limiter(), config)
}

/// The protocol every test stream is opened for.
const PROTOCOL: &str = BLOBS_SIDECARS_BY_RANGE_PROTOCOL;
