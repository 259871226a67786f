//! Various noop implementations for traits.

use crate::{
    BackfillStatusProvider, BackfillStatusWriter, BlockReader, CheckpointProvider, SidecarReader,
};
use ember_primitives::{BackfillStatus, BlobsSidecar, SignedBeaconBlock, Slot, B256};
use ember_storage_errors::provider::ProviderResult;

/// Supports various api interfaces for testing purposes.
///
/// Behaves like an empty database of a node that was synced from genesis: every lookup comes
/// back empty and writes are discarded.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct NoopProvider;

impl BackfillStatusProvider for NoopProvider {
    fn backfill_status(&self) -> ProviderResult<Option<BackfillStatus>> {
        Ok(None)
    }
}

impl BackfillStatusWriter for NoopProvider {
    fn save_backfill_status(&self, _status: &BackfillStatus) -> ProviderResult<()> {
        Ok(())
    }
}

impl CheckpointProvider for NoopProvider {
    fn origin_checkpoint_root(&self) -> ProviderResult<Option<B256>> {
        Ok(None)
    }

    fn genesis_block_root(&self) -> ProviderResult<Option<B256>> {
        Ok(None)
    }
}

impl BlockReader for NoopProvider {
    fn block_by_root(&self, _root: B256) -> ProviderResult<Option<SignedBeaconBlock>> {
        Ok(None)
    }
}

impl SidecarReader for NoopProvider {
    fn blobs_sidecars_by_slot(&self, _slot: Slot) -> ProviderResult<Vec<BlobsSidecar>> {
        Ok(Vec::new())
    }
}
