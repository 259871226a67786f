use ember_primitives::{BlobsSidecar, Slot};
use ember_storage_errors::provider::ProviderResult;

/// Api trait for fetching blob sidecars.
#[auto_impl::auto_impl(&, Arc)]
pub trait SidecarReader: Send + Sync {
    /// Returns all sidecars stored for the given slot, in storage order.
    ///
    /// An empty vector means nothing is stored for the slot.
    fn blobs_sidecars_by_slot(&self, slot: Slot) -> ProviderResult<Vec<BlobsSidecar>>;
}
