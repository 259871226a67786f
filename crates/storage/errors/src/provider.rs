use crate::db::DatabaseError;
use ember_primitives::{Slot, B256};

/// Provider result type.
pub type ProviderResult<Ok> = Result<Ok, ProviderError>;

/// Errors returned by the storage providers.
///
/// A missing record is not an error: lookups return `Ok(None)` for it. These variants cover
/// failures of the backend itself.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Database error.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The stored backfill status could not be read.
    #[error("failed to read backfill status: {0}")]
    BackfillStatus(DatabaseError),
    /// Sidecars of a slot could not be read.
    #[error("failed to read blobs sidecars for slot {slot}: {source}")]
    SidecarsBySlot {
        /// Slot that was queried.
        slot: Slot,
        /// The underlying database error.
        source: DatabaseError,
    },
    /// The block with the given root could not be read.
    #[error("failed to read block with root {root}: {source}")]
    BlockByRoot {
        /// Root that was queried.
        root: B256,
        /// The underlying database error.
        source: DatabaseError,
    },
}
