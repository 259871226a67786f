//! Shared types across ember network code.
//!
//! ## Feature Flags
//!
//! This crate has no feature flags.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cost;
pub mod ratelimit;
