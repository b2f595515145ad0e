//! Forest diagnostics.

use std::fmt;

/// Snapshot of a forest's node and slot accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodStats {
    /// Live nodes, cached ones included.
    pub nodes: usize,
    pub ready_leaves: usize,
    pub building_leaves: usize,
    /// Building leaves whose geometry is waiting for a slot.
    pub parked: usize,
    pub internal: usize,
    pub merging: usize,
    /// Nodes held in merge caches.
    pub cached_nodes: usize,
    pub allocated_slots: usize,
    pub free_slots: usize,
    pub pending_builds: usize,
    /// Completions rejected because their node or ticket was gone.
    pub stale_completions: u64,
}

impl fmt::Display for LodStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes={} ready={} building={} (parked {}) internal={} merging={} cached={} \
             slots={}/{} pending={} stale={}",
            self.nodes,
            self.ready_leaves,
            self.building_leaves,
            self.parked,
            self.internal,
            self.merging,
            self.cached_nodes,
            self.allocated_slots,
            self.allocated_slots + self.free_slots,
            self.pending_builds,
            self.stale_completions,
        )
    }
}
