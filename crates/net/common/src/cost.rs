//! Cost model for served response chunks.

use ember_primitives::BlobsSidecar;

/// Fixed cost in bytes of the `beacon_block_root` and `beacon_block_slot` fields of a sidecar.
pub const SIDECAR_OVERHEAD_COST: usize = 32 + 8;

/// Estimates the cost of serving a single sidecar.
///
/// The cost is the fixed identifying overhead plus the length of every blob's content.
pub fn estimate_sidecar_cost(sidecar: &BlobsSidecar) -> usize {
    SIDECAR_OVERHEAD_COST + sidecar.blob_bytes()
}
