use ember_primitives::B256;
use ember_storage_errors::provider::ProviderResult;

/// Client trait for the roots recorded when the node was initialized.
#[auto_impl::auto_impl(&, Arc)]
pub trait CheckpointProvider: Send + Sync {
    /// Root of the block the node was checkpoint synced from.
    ///
    /// Returns `None` if the node was synced from genesis.
    fn origin_checkpoint_root(&self) -> ProviderResult<Option<B256>>;

    /// Root of the genesis block, if known.
    fn genesis_block_root(&self) -> ProviderResult<Option<B256>>;
}
