use crate::{BlockReader, CheckpointProvider};
use ember_primitives::BackfillStatus;
use ember_storage_errors::provider::ProviderResult;

/// Client trait for reading the persisted [`BackfillStatus`].
#[auto_impl::auto_impl(&, Arc)]
pub trait BackfillStatusProvider: Send + Sync {
    /// Returns the stored backfill status, or `None` if it was never written.
    fn backfill_status(&self) -> ProviderResult<Option<BackfillStatus>>;
}

/// Client trait for persisting the [`BackfillStatus`].
#[auto_impl::auto_impl(&, Arc)]
pub trait BackfillStatusWriter: Send + Sync {
    /// Replaces the stored backfill status with the given value.
    fn save_backfill_status(&self, status: &BackfillStatus) -> ProviderResult<()>;
}

/// Everything the backfill tracker needs from storage.
pub trait BackfillStore:
    BackfillStatusProvider + BackfillStatusWriter + CheckpointProvider + BlockReader
{
}

impl<T> BackfillStore for T where
    T: BackfillStatusProvider + BackfillStatusWriter + CheckpointProvider + BlockReader
{
}
