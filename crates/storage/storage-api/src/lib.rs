//! Collection of traits and types for common storage access.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-export used error types.
pub use ember_storage_errors as errors;

mod backfill;
pub use backfill::*;

mod block;
pub use block::*;

mod checkpoint;
pub use checkpoint::*;

mod sidecars;
pub use sidecars::*;

pub mod noop;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers for mocking out the storage backend.
pub mod test_utils;
