//! Cube-sphere geometry for patch terrain: the six root faces, patch frames
//! in cube space, quadrant subdivision, and projection onto the sphere.

mod cube_face;
mod patch_frame;

pub use cube_face::{CubeFace, FaceBasis};
pub use patch_frame::{PatchFrame, Quadrant, cube_to_unit_sphere};
