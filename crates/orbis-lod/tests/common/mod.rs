#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use glam::DVec3;
use orbis_cubesphere::{CubeFace, PatchFrame};
use orbis_lod::{
    Generator, LodSettings, NodeState, PatchDraw, PatchForest, PlanetFrame, RenderSink, SlotIndex,
};

pub const RADIUS: f64 = 1_000.0;

pub struct Flat;

impl Generator for Flat {
    fn height(&self, _p: DVec3) -> f32 {
        0.0
    }
}

pub struct Hills;

impl Generator for Hills {
    fn height(&self, p: DVec3) -> f32 {
        (8.0 * (p.x * 11.0).sin() * (p.y * 7.0).cos() + 3.0 * (p.z * 17.0).sin()) as f32
    }

    fn ground_offset(&self, _p: DVec3) -> f32 {
        2.0
    }
}

/// Keeps the draws of the most recent frame.
#[derive(Default)]
pub struct RecordingSink {
    pub index_uploads: usize,
    pub vertex_uploads: usize,
    pub draws: Vec<PatchDraw>,
}

impl RecordingSink {
    pub fn begin_frame(&mut self) {
        self.draws.clear();
    }

    pub fn drawn_slots(&self) -> Vec<SlotIndex> {
        let mut slots: Vec<_> = self.draws.iter().map(|d| d.slot).collect();
        slots.sort();
        slots
    }
}

impl RenderSink for RecordingSink {
    fn write_indices(&mut self, _indices: &[u32]) {
        self.index_uploads += 1;
    }

    fn write_vertices(&mut self, _slot: SlotIndex, _first_vertex: u32, _bytes: &[u8]) {
        self.vertex_uploads += 1;
    }

    fn draw_patch(&mut self, draw: &PatchDraw) {
        self.draws.push(*draw);
    }
}

pub fn settings(arena_capacity: usize, max_depth: u8) -> LodSettings {
    LodSettings {
        arena_capacity,
        patch_resolution: 5,
        max_depth,
        ..Default::default()
    }
}

/// A forest with one unbuilt +Y root.
pub fn single_root_forest(settings: LodSettings) -> PatchForest {
    let mut forest = PatchForest::new(settings, PlanetFrame::at_origin(RADIUS), Arc::new(Flat))
        .expect("valid settings");
    forest.plant_root(PatchFrame::root(CubeFace::PosY));
    forest
}

/// Just above the centre of the +Y face.
pub fn near_pos_y() -> DVec3 {
    DVec3::new(0.0, RADIUS + 1.0, 0.0)
}

pub fn far_away() -> DVec3 {
    DVec3::new(0.0, RADIUS * 1.0e4, 0.0)
}

/// Structural invariants that must hold after every frame.
pub fn assert_invariants(forest: &PatchForest) {
    let arena = forest.arena();
    let mut owned = HashSet::new();
    for (id, node) in forest.nodes() {
        assert_eq!(
            node.geometry().is_some(),
            node.state() == NodeState::ReadyLeaf,
            "{id:?} in {:?} has geometry={}",
            node.state(),
            node.geometry().is_some()
        );
        assert!(
            !(node.children().is_some() && node.cached_children().is_some()),
            "{id:?} has both live and cached children"
        );
        if let Some(slot) = node.slot() {
            assert!(arena.is_allocated(slot), "{id:?} holds free slot {slot:?}");
            assert!(owned.insert(slot), "{slot:?} owned by two nodes");
        }
        if let Some(parent) = node.parent().and_then(|p| forest.node(p)) {
            assert_eq!(node.error_threshold(), parent.error_threshold() / 2.0);
            assert_eq!(node.depth(), parent.depth() + 1);
        }
    }
    assert_eq!(owned.len(), arena.allocated_count(), "arena slot owned by no node");
}

/// Drawn leaves and allocated slots match one to one. Only meaningful once
/// no builds, merges, or parked results are outstanding.
pub fn assert_draws_partition_slots(forest: &PatchForest, sink: &RecordingSink) {
    let drawn = sink.drawn_slots();
    let mut unique = drawn.clone();
    unique.dedup();
    assert_eq!(unique.len(), drawn.len(), "a slot was drawn twice");
    let allocated: Vec<_> = forest.arena().allocated_slots().collect();
    assert_eq!(drawn, allocated);
}
