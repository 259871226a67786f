//! Commonly used error types used when interacting with the database.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// Database error
pub mod db;

/// Provider error
pub mod provider;
