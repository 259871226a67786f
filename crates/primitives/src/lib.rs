//! Commonly used types in ember.
//!
//! This crate contains the beacon chain primitives shared by the backfill tracker, the storage
//! traits and the range request handler.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod backfill;
mod block;
mod sidecar;

pub use backfill::BackfillStatus;
pub use block::SignedBeaconBlock;
pub use sidecar::{Blob, BlobsSidecar};

pub use alloy_primitives::{Bytes, B256, B512};

/// A beacon chain slot number.
pub type Slot = u64;

/// Identifier of a remote peer.
pub type PeerId = B512;

/// The all-zero root.
///
/// Sidecars referencing this root are placeholders without an associated block.
pub const ZERO_HASH: B256 = B256::ZERO;
