use ember_primitives::{SignedBeaconBlock, B256};
use ember_storage_errors::provider::ProviderResult;

/// Api trait for fetching beacon blocks.
#[auto_impl::auto_impl(&, Arc)]
pub trait BlockReader: Send + Sync {
    /// Returns the block with the given root, if known.
    fn block_by_root(&self, root: B256) -> ProviderResult<Option<SignedBeaconBlock>>;
}
