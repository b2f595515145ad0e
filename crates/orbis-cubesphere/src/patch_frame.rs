//! Patch frames: a parallelogram on the cube surface given by an origin
//! corner and two extent vectors.

use glam::DVec3;

use crate::CubeFace;

/// Radially project a point on the cube surface onto the unit sphere.
///
/// The projection is non-expansive for points outside the unit ball, so a
/// sub-patch is never larger on the sphere than the patch it came from.
#[inline]
#[must_use]
pub fn cube_to_unit_sphere(cube_point: DVec3) -> DVec3 {
    cube_point.normalize()
}

/// One of the four children of a subdivided patch.
///
/// Ordered bottom-left, bottom-right, top-left, top-right in the patch's
/// own `(s, t)` parameterisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    /// `s ∈ [0, ½]`, `t ∈ [0, ½]`
    BottomLeft = 0,
    /// `s ∈ [½, 1]`, `t ∈ [0, ½]`
    BottomRight = 1,
    /// `s ∈ [0, ½]`, `t ∈ [½, 1]`
    TopLeft = 2,
    /// `s ∈ [½, 1]`, `t ∈ [½, 1]`
    TopRight = 3,
}

impl Quadrant {
    /// All quadrants in child order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
        Quadrant::TopLeft,
        Quadrant::TopRight,
    ];

    /// Offset of this quadrant's origin in units of half the parent extent.
    #[must_use]
    pub fn offset(self) -> (f64, f64) {
        match self {
            Quadrant::BottomLeft => (0.0, 0.0),
            Quadrant::BottomRight => (1.0, 0.0),
            Quadrant::TopLeft => (0.0, 1.0),
            Quadrant::TopRight => (1.0, 1.0),
        }
    }
}

/// A patch of the cube surface in patch-local (cube) space.
///
/// Points are `origin + s * u_extent + t * v_extent` for `s, t ∈ [0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchFrame {
    /// Corner at `(s, t) = (0, 0)`.
    pub origin: DVec3,
    /// Edge vector along `s`.
    pub u_extent: DVec3,
    /// Edge vector along `t`.
    pub v_extent: DVec3,
}

impl PatchFrame {
    /// The frame covering an entire cube face.
    #[must_use]
    pub fn root(face: CubeFace) -> Self {
        let b = face.basis();
        Self {
            origin: b.normal - b.tangent - b.bitangent,
            u_extent: b.tangent * 2.0,
            v_extent: b.bitangent * 2.0,
        }
    }

    /// The child frame for one quadrant: origin offset by half of each
    /// axis, both extents halved.
    #[must_use]
    pub fn quadrant(&self, quadrant: Quadrant) -> Self {
        let half_u = self.u_extent * 0.5;
        let half_v = self.v_extent * 0.5;
        let (ds, dt) = quadrant.offset();
        Self {
            origin: self.origin + half_u * ds + half_v * dt,
            u_extent: half_u,
            v_extent: half_v,
        }
    }

    /// Point on the cube surface at `(s, t)`.
    #[inline]
    #[must_use]
    pub fn cube_point(&self, s: f64, t: f64) -> DVec3 {
        self.origin + self.u_extent * s + self.v_extent * t
    }

    /// Unit-sphere direction through `(s, t)`.
    #[inline]
    #[must_use]
    pub fn sphere_dir(&self, s: f64, t: f64) -> DVec3 {
        cube_to_unit_sphere(self.cube_point(s, t))
    }

    /// The four corners in `(0,0) (1,0) (0,1) (1,1)` order.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 4] {
        [
            self.cube_point(0.0, 0.0),
            self.cube_point(1.0, 0.0),
            self.cube_point(0.0, 1.0),
            self.cube_point(1.0, 1.0),
        ]
    }
}
