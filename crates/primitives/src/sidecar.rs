use crate::{Slot, ZERO_HASH};
use alloy_primitives::{Bytes, B256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// A single blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blob {
    /// Raw blob content.
    pub data: Bytes,
}

/// All blobs committed to by one beacon block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlobsSidecar {
    /// Root of the block the blobs belong to.
    pub beacon_block_root: B256,
    /// Slot of the block the blobs belong to.
    pub beacon_block_slot: Slot,
    /// The blobs, in commitment order.
    pub blobs: Vec<Blob>,
    /// Aggregated KZG proof over all blobs.
    pub kzg_aggregated_proof: Bytes,
}

impl BlobsSidecar {
    /// Returns `true` if the sidecar is not associated with any block.
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.beacon_block_root == ZERO_HASH
    }

    /// Total number of blob bytes carried by this sidecar.
    pub fn blob_bytes(&self) -> usize {
        self.blobs.iter().map(|blob| blob.data.len()).sum()
    }
}
