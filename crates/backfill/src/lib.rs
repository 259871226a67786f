//! Backfill status tracking.
//!
//! A node that joined the network through checkpoint sync is missing all history between
//! genesis and the checkpoint. The [`BackfillStatusTracker`] keeps the boundaries of that gap,
//! persists every change before exposing it and answers whether a given slot is available
//! locally.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
mod status;

pub use error::BackfillError;
pub use status::BackfillStatusTracker;
