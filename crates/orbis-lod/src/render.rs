//! What the LOD core needs from the renderer and the camera.

use glam::DVec3;

use crate::{NodeId, SlotIndex};

/// Viewer position, queried once per LOD pass.
pub trait Camera {
    /// World-space position.
    fn position(&self) -> DVec3;
}

impl Camera for DVec3 {
    fn position(&self) -> DVec3 {
        *self
    }
}

/// One leaf draw: a slot of the shared vertex buffer drawn with the shared
/// index list, translated to the patch's world centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchDraw {
    pub node: NodeId,
    pub slot: SlotIndex,
    /// Base vertex of the slot in the shared buffer.
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    /// World-space origin the slot's vertex positions are relative to.
    pub origin: DVec3,
    pub depth: u8,
}

/// Shared vertex and index buffers plus a draw queue.
pub trait RenderSink {
    /// Replace the shared index buffer. Called once, before any draw.
    fn write_indices(&mut self, indices: &[u32]);

    /// Overwrite one slot's region, starting at vertex `first_vertex`.
    /// `bytes` is a whole number of [`PatchVertex`](crate::PatchVertex)es.
    fn write_vertices(&mut self, slot: SlotIndex, first_vertex: u32, bytes: &[u8]);

    /// Draw one leaf.
    fn draw_patch(&mut self, draw: &PatchDraw);
}
