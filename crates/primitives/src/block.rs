use crate::Slot;
use alloy_primitives::B256;
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// A signed beacon block, reduced to the fields the sync subsystem reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignedBeaconBlock {
    /// Slot the block was proposed in.
    pub slot: Slot,
    /// Root of the parent block.
    pub parent_root: B256,
    /// Post state root.
    pub state_root: B256,
    /// Root of the block body.
    pub body_root: B256,
}

impl SignedBeaconBlock {
    /// Slot the block was proposed in.
    #[inline]
    pub const fn slot(&self) -> Slot {
        self.slot
    }
}
