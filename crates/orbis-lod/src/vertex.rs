//! Patch vertex layout and the index list shared by every patch.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// One terrain vertex as written into an arena slot.
///
/// `position` is relative to the owning patch's world-space centre so the
/// `f32` stays precise at planetary distances.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    /// Offset from the patch centre.
    pub position: [f32; 3],
    /// Unit surface normal.
    pub normal: [f32; 3],
    /// Face-space texture coordinate.
    pub uv: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<PatchVertex>(), 32);

/// Triangle list for a `resolution × resolution` vertex grid.
///
/// Indices are slot-relative: the draw call adds the slot's first vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexTemplate {
    resolution: u32,
    indices: Vec<u32>,
}

impl IndexTemplate {
    /// Build the two-triangles-per-cell list, counter-clockwise when the
    /// grid runs along `+s` then `+t` of a right-handed patch frame.
    #[must_use]
    pub fn grid(resolution: u32) -> Self {
        let cells = resolution.saturating_sub(1);
        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for t in 0..cells {
            for s in 0..cells {
                let a = t * resolution + s;
                let b = a + 1;
                let c = a + resolution;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, d, a, d, c]);
            }
        }
        Self {
            resolution,
            indices,
        }
    }

    /// Vertices along one patch edge.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// The triangle list.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices one patch draw consumes.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
