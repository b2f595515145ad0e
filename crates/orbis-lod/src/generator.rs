//! The terrain capability patch builds consume.

use glam::DVec3;

/// Height function of the planet surface.
///
/// Sampled from worker threads, so implementations must be immutable or
/// internally synchronised. A panic inside either method is treated as a
/// fatal generator fault.
pub trait Generator: Send + Sync {
    /// Terrain height above the datum at a unit-sphere direction.
    fn height(&self, point: DVec3) -> f32;

    /// Offset of the datum from the planet radius at `point` (sea level,
    /// crust offset). Zero unless the generator overrides it.
    fn ground_offset(&self, _point: DVec3) -> f32 {
        0.0
    }
}

/// Planet placement and size shared by every patch of a forest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetFrame {
    /// World-space planet centre.
    pub centre: DVec3,
    /// Radius of the height datum.
    pub radius: f64,
}

impl PlanetFrame {
    /// A planet of `radius` centred on the world origin.
    #[must_use]
    pub fn at_origin(radius: f64) -> Self {
        Self {
            centre: DVec3::ZERO,
            radius,
        }
    }

    /// World-space point on the datum sphere along `dir`.
    #[inline]
    #[must_use]
    pub fn datum_point(&self, dir: DVec3) -> DVec3 {
        self.centre + dir * self.radius
    }

    /// World-space surface point along `dir` according to `generator`.
    #[inline]
    #[must_use]
    pub fn surface_point(&self, generator: &dyn Generator, dir: DVec3) -> DVec3 {
        let radius =
            self.radius + f64::from(generator.ground_offset(dir)) + f64::from(generator.height(dir));
        self.centre + dir * radius
    }
}
