use crate::{
    BackfillStatusProvider, BackfillStatusWriter, BlockReader, CheckpointProvider, SidecarReader,
};
use ember_primitives::{BackfillStatus, BlobsSidecar, SignedBeaconBlock, Slot, B256};
use ember_storage_errors::{
    db::{DatabaseError, DatabaseErrorInfo},
    provider::{ProviderError, ProviderResult},
};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

/// An in-memory storage backend that records how it is used.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    inner: Arc<Mutex<MockStorageInner>>,
}

#[derive(Debug, Default)]
struct MockStorageInner {
    backfill_status: Option<BackfillStatus>,
    origin_checkpoint_root: Option<B256>,
    genesis_block_root: Option<B256>,
    blocks: HashMap<B256, SignedBeaconBlock>,
    sidecars: BTreeMap<Slot, Vec<BlobsSidecar>>,
    failing_slots: HashSet<Slot>,
    fail_status_read: bool,
    fail_checkpoint_reads: bool,
    fail_block_reads: bool,
    fail_writes: bool,
    saves: usize,
    queried_slots: Vec<Slot>,
}

impl MockStorage {
    /// Storage of a node that was checkpoint synced from the given block.
    ///
    /// The block is inserted under `origin_root`.
    pub fn checkpoint_synced(genesis_root: B256, origin_root: B256, origin_slot: Slot) -> Self {
        let storage = Self::default();
        storage.set_genesis_block_root(genesis_root);
        storage.set_origin_checkpoint_root(origin_root);
        let origin = SignedBeaconBlock { slot: origin_slot, ..Default::default() };
        storage.insert_block(origin_root, origin);
        storage
    }

    /// Sets the persisted backfill status without counting it as a save.
    pub fn set_backfill_status(&self, status: BackfillStatus) {
        self.inner.lock().backfill_status = Some(status);
    }

    /// Sets the origin checkpoint root.
    pub fn set_origin_checkpoint_root(&self, root: B256) {
        self.inner.lock().origin_checkpoint_root = Some(root);
    }

    /// Sets the genesis block root.
    pub fn set_genesis_block_root(&self, root: B256) {
        self.inner.lock().genesis_block_root = Some(root);
    }

    /// Inserts a block under the given root.
    pub fn insert_block(&self, root: B256, block: SignedBeaconBlock) {
        self.inner.lock().blocks.insert(root, block);
    }

    /// Appends sidecars to the given slot.
    pub fn extend_sidecars(&self, slot: Slot, sidecars: impl IntoIterator<Item = BlobsSidecar>) {
        self.inner.lock().sidecars.entry(slot).or_default().extend(sidecars);
    }

    /// Makes every sidecar lookup for the slot fail.
    pub fn fail_slot(&self, slot: Slot) {
        self.inner.lock().failing_slots.insert(slot);
    }

    /// Makes reading the backfill status fail.
    pub fn fail_status_read(&self) {
        self.inner.lock().fail_status_read = true;
    }

    /// Makes reading the genesis and origin checkpoint roots fail.
    pub fn fail_checkpoint_reads(&self) {
        self.inner.lock().fail_checkpoint_reads = true;
    }

    /// Makes every block lookup fail.
    pub fn fail_block_reads(&self) {
        self.inner.lock().fail_block_reads = true;
    }

    /// Makes every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Number of successful backfill status writes.
    pub fn saves(&self) -> usize {
        self.inner.lock().saves
    }

    /// The currently persisted backfill status.
    pub fn persisted_status(&self) -> Option<BackfillStatus> {
        self.inner.lock().backfill_status
    }

    /// All slots sidecars were requested for, in request order.
    pub fn queried_slots(&self) -> Vec<Slot> {
        self.inner.lock().queried_slots.clone()
    }
}

fn backend_error(message: &str) -> DatabaseError {
    DatabaseError::Read(DatabaseErrorInfo::new(message, -1))
}

impl BackfillStatusProvider for MockStorage {
    fn backfill_status(&self) -> ProviderResult<Option<BackfillStatus>> {
        let inner = self.inner.lock();
        if inner.fail_status_read {
            return Err(ProviderError::BackfillStatus(backend_error("status table unavailable")))
        }
        Ok(inner.backfill_status)
    }
}

impl BackfillStatusWriter for MockStorage {
    fn save_backfill_status(&self, status: &BackfillStatus) -> ProviderResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(DatabaseError::Commit(DatabaseErrorInfo::new("disk full", 28)).into())
        }
        inner.backfill_status = Some(*status);
        inner.saves += 1;
        Ok(())
    }
}

impl CheckpointProvider for MockStorage {
    fn origin_checkpoint_root(&self) -> ProviderResult<Option<B256>> {
        let inner = self.inner.lock();
        if inner.fail_checkpoint_reads {
            return Err(backend_error("checkpoint table unavailable").into())
        }
        Ok(inner.origin_checkpoint_root)
    }

    fn genesis_block_root(&self) -> ProviderResult<Option<B256>> {
        let inner = self.inner.lock();
        if inner.fail_checkpoint_reads {
            return Err(backend_error("checkpoint table unavailable").into())
        }
        Ok(inner.genesis_block_root)
    }
}

impl BlockReader for MockStorage {
    fn block_by_root(&self, root: B256) -> ProviderResult<Option<SignedBeaconBlock>> {
        let inner = self.inner.lock();
        if inner.fail_block_reads {
            let source = backend_error("corrupted block");
            return Err(ProviderError::BlockByRoot { root, source })
        }
        Ok(inner.blocks.get(&root).copied())
    }
}

impl SidecarReader for MockStorage {
    fn blobs_sidecars_by_slot(&self, slot: Slot) -> ProviderResult<Vec<BlobsSidecar>> {
        let mut inner = self.inner.lock();
        inner.queried_slots.push(slot);
        if inner.failing_slots.contains(&slot) {
            return Err(ProviderError::SidecarsBySlot {
                slot,
                source: backend_error("corrupted sidecar entry"),
            })
        }
        Ok(inner.sidecars.get(&slot).cloned().unwrap_or_default())
    }
}
