use crate::Slot;
use alloy_primitives::B256;
use alloy_rlp::{RlpDecodable, RlpEncodable};
use std::ops::RangeInclusive;

/// The known boundaries of missing history after a checkpoint sync.
///
/// Slots `<= low_slot` and `>= high_slot` are available locally, everything strictly between
/// the two is the gap that still has to be backfilled. The origin is the checkpoint the node
/// was initialized from and never changes once recorded.
///
/// The value is always replaced as a whole, there are no partial updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackfillStatus {
    /// Lower boundary of contiguous history.
    pub low_slot: Slot,
    /// Block root at `low_slot`.
    pub low_root: B256,
    /// Upper boundary of contiguous history.
    pub high_slot: Slot,
    /// Block root at `high_slot`.
    pub high_root: B256,
    /// Slot of the checkpoint sync origin block.
    pub origin_slot: Slot,
    /// Root of the checkpoint sync origin block.
    pub origin_root: B256,
}

impl BackfillStatus {
    /// Returns the status for a node that was initialized from the given checkpoint.
    ///
    /// The whole range between genesis and the origin is missing.
    pub const fn from_checkpoint(genesis_root: B256, origin_slot: Slot, origin_root: B256) -> Self {
        Self {
            low_slot: 0,
            low_root: genesis_root,
            high_slot: origin_slot,
            high_root: origin_root,
            origin_slot,
            origin_root,
        }
    }

    /// Returns `true` if the slot is not inside the gap.
    #[inline]
    pub const fn slot_covered(&self, slot: Slot) -> bool {
        !(self.low_slot < slot && slot < self.high_slot)
    }

    /// Returns `true` if there is no slot left strictly between the boundaries.
    #[inline]
    pub const fn is_closed(&self) -> bool {
        self.high_slot.saturating_sub(self.low_slot) <= 1
    }

    /// Returns the missing slots, or `None` if the gap was closed.
    pub fn gap(&self) -> Option<RangeInclusive<Slot>> {
        (!self.is_closed()).then(|| self.low_slot + 1..=self.high_slot - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::{Decodable, Encodable};

    #[test]
    fn coverage_excludes_open_interval() {
        let status = BackfillStatus { low_slot: 10, high_slot: 20, ..Default::default() };

        assert!(status.slot_covered(0));
        assert!(status.slot_covered(10));
        assert!(!status.slot_covered(11));
        assert!(!status.slot_covered(19));
        assert!(status.slot_covered(20));
        assert!(status.slot_covered(u64::MAX));
    }

    #[test]
    fn gap_bounds() {
        let status = BackfillStatus { low_slot: 10, high_slot: 20, ..Default::default() };
        assert_eq!(status.gap(), Some(11..=19));
        assert!(!status.is_closed());

        let adjacent = BackfillStatus { low_slot: 10, high_slot: 11, ..Default::default() };
        assert!(adjacent.is_closed());
        assert_eq!(adjacent.gap(), None);

        let equal = BackfillStatus { low_slot: 10, high_slot: 10, ..Default::default() };
        assert_eq!(equal.gap(), None);
    }

    #[test]
    fn from_checkpoint_spans_genesis_to_origin() {
        let genesis = B256::random();
        let origin = B256::random();
        let status = BackfillStatus::from_checkpoint(genesis, 4096, origin);

        assert_eq!(status.low_slot, 0);
        assert_eq!(status.low_root, genesis);
        assert_eq!(status.high_slot, 4096);
        assert_eq!(status.origin_slot, status.high_slot);
        assert_eq!(status.origin_root, origin);
    }

    #[test]
    fn decodes_persisted_record() {
        let status = BackfillStatus::from_checkpoint(B256::random(), 77, B256::random());
        let mut buf = Vec::with_capacity(status.length());
        status.encode(&mut buf);

        let decoded = BackfillStatus::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, status);
    }
}
