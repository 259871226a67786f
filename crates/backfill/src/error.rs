use ember_primitives::{Slot, B256};
use ember_storage_api::errors::provider::ProviderError;

/// Errors returned by the [`BackfillStatusTracker`](crate::BackfillStatusTracker).
#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    /// The new low boundary would be above the high boundary.
    #[error(
        "cannot move backfill status above upper bound of backfill: advance slot={slot}, upper slot={upper}"
    )]
    FillFwdPastUpper {
        /// Requested low boundary.
        slot: Slot,
        /// Current high boundary.
        upper: Slot,
    },
    /// The new high boundary would be below the low boundary.
    #[error(
        "cannot move backfill status below lower bound of backfill: advance slot={slot}, lower slot={lower}"
    )]
    FillBackPastLower {
        /// Requested high boundary.
        slot: Slot,
        /// Current low boundary.
        lower: Slot,
    },
    /// Looking up the origin checkpoint block failed.
    #[error("error retrieving block for origin checkpoint root={root}: {source}")]
    OriginBlockLookup {
        /// The origin checkpoint root.
        root: B256,
        /// The storage error.
        source: ProviderError,
    },
    /// The origin checkpoint root is recorded but its block is not.
    #[error("block not found for origin checkpoint root={root}")]
    MissingOriginBlock {
        /// The origin checkpoint root.
        root: B256,
    },
    /// Checkpoint sync without a recorded genesis root.
    #[error("genesis block root required for checkpoint sync")]
    MissingGenesisRoot,
    /// Storage error.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl BackfillError {
    /// Returns `true` if the error is a rejected boundary move.
    ///
    /// Those leave the tracker untouched, any other error means storage is unusable.
    pub const fn is_bounds_violation(&self) -> bool {
        matches!(self, Self::FillFwdPastUpper { .. } | Self::FillBackPastLower { .. })
    }
}
