use crate::BackfillError;
use ember_primitives::{BackfillStatus, Slot, B256};
use ember_storage_api::BackfillStore;
use parking_lot::RwLock;
use std::ops::RangeInclusive;
use tracing::{debug, info, trace};

/// Keeps track of the history gap left behind by checkpoint sync.
///
/// There must be exactly one tracker per storage backend, shared by reference between the sync
/// orchestrator moving the boundaries and everyone asking whether a slot is available. Every
/// boundary move is validated, persisted and only then applied to the in-memory copy, all while
/// holding the write lock, so the cached [`BackfillStatus`] never runs ahead of storage.
#[derive(Debug)]
pub struct BackfillStatusTracker<P> {
    /// Storage backend the status is persisted to.
    provider: P,
    /// Cached state, mirrors the last successful write.
    state: RwLock<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    /// Set if the node has full history because it was synced from genesis.
    genesis_sync: bool,
    status: BackfillStatus,
}

// === impl BackfillStatusTracker ===

impl<P> BackfillStatusTracker<P> {
    /// Creates a tracker bound to the given storage.
    ///
    /// The tracker is empty until [`BackfillStatusTracker::reload`] was called.
    pub fn new(provider: P) -> Self {
        Self { provider, state: RwLock::new(TrackerState::default()) }
    }

    /// Returns `true` if the slot is available locally.
    ///
    /// Always `true` for a node synced from genesis, otherwise `true` unless the slot lies
    /// strictly between the low and high boundary.
    pub fn slot_covered(&self, slot: Slot) -> bool {
        let state = self.state.read();
        // short circuit if the node was synced from genesis
        if state.genesis_sync {
            return true
        }
        state.status.slot_covered(slot)
    }

    /// Returns a copy of the current status.
    pub fn status(&self) -> BackfillStatus {
        self.state.read().status
    }

    /// Returns `true` if the node was synced from genesis and has no gap to fill.
    pub fn is_genesis_synced(&self) -> bool {
        self.state.read().genesis_sync
    }

    /// Returns the slots that are still missing, `None` if there are none.
    pub fn gap(&self) -> Option<RangeInclusive<Slot>> {
        let state = self.state.read();
        if state.genesis_sync {
            return None
        }
        state.status.gap()
    }

    /// Returns `true` once there is nothing left to backfill.
    pub fn is_gap_closed(&self) -> bool {
        self.gap().is_none()
    }

    /// Returns the underlying storage.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> BackfillStatusTracker<P>
where
    P: BackfillStore,
{
    /// Loads the status from storage.
    ///
    /// Databases written before the status record existed are recovered from the origin
    /// checkpoint root: without one the node was synced from genesis, with one the status is
    /// rebuilt from the origin block and the genesis root and persisted.
    pub fn reload(&self) -> Result<(), BackfillError> {
        let mut state = self.state.write();
        match self.provider.backfill_status()? {
            Some(status) => {
                debug!(target: "sync::backfill", ?status, "Loaded backfill status");
                state.genesis_sync = false;
                state.status = status;
                Ok(())
            }
            None => self.recover_legacy(&mut state),
        }
    }

    /// Moves the lower boundary up to `new_low`.
    ///
    /// Fails without touching the state if `new_low` is above the current upper boundary.
    pub fn fill_fwd(&self, new_low: Slot, root: B256) -> Result<(), BackfillError> {
        let mut state = self.state.write();
        let upper = state.status.high_slot;
        if new_low > upper {
            return Err(BackfillError::FillFwdPastUpper { slot: new_low, upper })
        }
        let status = BackfillStatus { low_slot: new_low, low_root: root, ..state.status };
        self.update_status(&mut state, status)
    }

    /// Moves the upper boundary down to `new_high`.
    ///
    /// Fails without touching the state if `new_high` is below the current lower boundary.
    pub fn fill_back(&self, new_high: Slot, root: B256) -> Result<(), BackfillError> {
        let mut state = self.state.write();
        let lower = state.status.low_slot;
        if new_high < lower {
            return Err(BackfillError::FillBackPastLower { slot: new_high, lower })
        }
        let status = BackfillStatus { high_slot: new_high, high_root: root, ..state.status };
        self.update_status(&mut state, status)
    }

    fn recover_legacy(&self, state: &mut TrackerState) -> Result<(), BackfillError> {
        let Some(origin_root) = self.provider.origin_checkpoint_root()? else {
            debug!(target: "sync::backfill", "No origin checkpoint, node was synced from genesis");
            state.genesis_sync = true;
            return Ok(())
        };

        let origin = self
            .provider
            .block_by_root(origin_root)
            .map_err(|source| BackfillError::OriginBlockLookup { root: origin_root, source })?
            .ok_or(BackfillError::MissingOriginBlock { root: origin_root })?;
        let genesis_root =
            self.provider.genesis_block_root()?.ok_or(BackfillError::MissingGenesisRoot)?;

        let status = BackfillStatus::from_checkpoint(genesis_root, origin.slot(), origin_root);
        info!(
            target: "sync::backfill",
            origin_slot = status.origin_slot,
            %origin_root,
            "Recovered backfill status from checkpoint sync origin"
        );
        self.update_status(state, status)
    }

    /// Persists the status and then caches it. Unchanged values are not written.
    fn update_status(
        &self,
        state: &mut TrackerState,
        status: BackfillStatus,
    ) -> Result<(), BackfillError> {
        if state.status == status {
            return Ok(())
        }
        self.provider.save_backfill_status(&status)?;
        trace!(
            target: "sync::backfill",
            low = status.low_slot,
            high = status.high_slot,
            "Updated backfill status"
        );
        state.status = status;
        Ok(())
    }
}
