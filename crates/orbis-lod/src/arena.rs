//! Fixed-capacity arena of equally sized vertex-buffer regions.
//!
//! The render side keeps one shared vertex buffer of
//! `capacity * vertices_per_slot` vertices; a [`SlotIndex`] names one
//! patch-sized region of it. Only the owning thread touches the arena.

use std::ops::Range;

/// One patch-sized region of the shared vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(u32);

impl SlotIndex {
    /// Position of this slot in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Free-list pool of vertex-buffer slots.
pub struct VertexArena {
    vertices_per_slot: usize,
    /// Free slots; the next allocation pops from the back.
    free: Vec<SlotIndex>,
    in_use: Vec<bool>,
}

impl VertexArena {
    /// Create an arena of `capacity` slots holding `vertices_per_slot`
    /// vertices each. All slots start free.
    #[must_use]
    pub fn new(capacity: usize, vertices_per_slot: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Self {
            vertices_per_slot,
            free: (0..capacity as u32).rev().map(SlotIndex).collect(),
            in_use: vec![false; capacity],
        }
    }

    /// Take a free slot, or `None` when every slot is owned.
    ///
    /// Exhaustion is an expected runtime condition: callers keep the
    /// coarser geometry resident and try again later.
    pub fn allocate(&mut self) -> Option<SlotIndex> {
        let slot = self.free.pop()?;
        self.in_use[slot.index()] = true;
        Some(slot)
    }

    /// Return a slot to the free list.
    ///
    /// Releasing a slot that is already free is a caller bug; it panics in
    /// debug builds and is ignored otherwise.
    pub fn deallocate(&mut self, slot: SlotIndex) {
        let Some(owned) = self.in_use.get_mut(slot.index()) else {
            debug_assert!(false, "slot {slot:?} is outside the arena");
            return;
        };
        debug_assert!(*owned, "double free of arena slot {slot:?}");
        if !*owned {
            tracing::error!(?slot, "ignoring release of a free arena slot");
            return;
        }
        *owned = false;
        self.free.push(slot);
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.in_use.len()
    }

    /// Number of slots available to [`allocate`](Self::allocate).
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of slots currently owned by a patch.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.capacity() - self.free_count()
    }

    /// Whether `slot` is currently owned.
    #[must_use]
    pub fn is_allocated(&self, slot: SlotIndex) -> bool {
        self.in_use.get(slot.index()).copied().unwrap_or(false)
    }

    /// Every owned slot, in index order.
    pub fn allocated_slots(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.in_use
            .iter()
            .enumerate()
            .filter(|(_, owned)| **owned)
            .map(|(i, _)| SlotIndex(i as u32))
    }

    /// Vertices per slot.
    #[must_use]
    pub fn vertices_per_slot(&self) -> usize {
        self.vertices_per_slot
    }

    /// Range of the shared vertex buffer (in vertices) backing `slot`.
    #[must_use]
    pub fn slot_range(&self, slot: SlotIndex) -> Range<usize> {
        let start = slot.index() * self.vertices_per_slot;
        start..start + self.vertices_per_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_until_exhausted() {
        let mut arena = VertexArena::new(4, 289);
        let slots: Vec<_> = (0..4).filter_map(|_| arena.allocate()).collect();
        assert_eq!(slots.len(), 4);
        assert_eq!(arena.free_count(), 0);
        assert_eq!(arena.allocate(), None, "fifth allocation must report exhaustion");
        assert_eq!(arena.allocate(), None, "exhaustion is not sticky state corruption");
    }

    #[test]
    fn test_allocate_deallocate_round_trip_restores_free_count() {
        let mut arena = VertexArena::new(8, 4);
        let _held = arena.allocate();
        let before = arena.free_count();
        let slot = arena.allocate().expect("arena has room");
        assert_eq!(arena.free_count(), before - 1);
        arena.deallocate(slot);
        assert_eq!(arena.free_count(), before);
        assert!(!arena.is_allocated(slot));
    }

    #[test]
    fn test_slots_are_unique_while_owned() {
        let mut arena = VertexArena::new(16, 4);
        let mut slots: Vec<_> = std::iter::from_fn(|| arena.allocate()).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 16);
        assert_eq!(arena.allocated_slots().count(), 16);
    }

    #[test]
    fn test_released_slot_is_reused() {
        let mut arena = VertexArena::new(2, 4);
        let a = arena.allocate().expect("slot");
        let _b = arena.allocate().expect("slot");
        arena.deallocate(a);
        assert_eq!(arena.allocate(), Some(a));
    }

    #[test]
    fn test_slot_ranges_do_not_overlap() {
        let mut arena = VertexArena::new(3, 25);
        let a = arena.allocate().expect("slot");
        let b = arena.allocate().expect("slot");
        let ra = arena.slot_range(a);
        let rb = arena.slot_range(b);
        assert_eq!(ra.len(), 25);
        assert!(ra.end <= rb.start || rb.end <= ra.start);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "double free")]
    fn test_double_free_is_debug_checked() {
        let mut arena = VertexArena::new(2, 4);
        let slot = arena.allocate().expect("slot");
        arena.deallocate(slot);
        arena.deallocate(slot);
    }
}
