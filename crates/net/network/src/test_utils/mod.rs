#![warn(missing_docs, unreachable_pub)]

//! Common helpers for network testing.

mod stream;

pub use stream::RecordingStream;

use ember_primitives::{Blob, BlobsSidecar, Bytes, Slot, B256};

/// Returns a sidecar for `slot` with `blobs` blobs of `blob_len` bytes each.
///
/// The block root is derived from the slot and never zero.
pub fn sidecar(slot: Slot, blobs: usize, blob_len: usize) -> BlobsSidecar {
    let mut beacon_block_root = B256::repeat_byte(0xee);
    beacon_block_root.0[24..].copy_from_slice(&slot.to_be_bytes());
    BlobsSidecar {
        beacon_block_root,
        beacon_block_slot: slot,
        blobs: (0..blobs).map(|i| Blob { data: Bytes::from(vec![i as u8; blob_len]) }).collect(),
        kzg_aggregated_proof: Bytes::from(vec![0xc0; 48]),
    }
}

/// Returns a sidecar for `slot` whose block root is the zero hash.
pub fn placeholder_sidecar(slot: Slot) -> BlobsSidecar {
    BlobsSidecar { beacon_block_slot: slot, ..Default::default() }
}
