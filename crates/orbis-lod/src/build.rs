//! Patch geometry synthesis.
//!
//! A [`BuildTask`] is an immutable snapshot of everything needed to mesh
//! one patch. [`BuildTask::build`] is a pure function of it and may run on
//! any thread; it never sees the live forest.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glam::{DVec2, DVec3};
use orbis_cubesphere::PatchFrame;

use crate::scheduler::BuildCompletion;
use crate::{Generator, IndexTemplate, NodeId, PatchVertex, PlanetFrame};

/// Work order for one patch build.
pub struct BuildTask {
    /// Patch the result belongs to.
    pub node: NodeId,
    /// Ticket the patch is waiting on; completions carrying any other
    /// ticket are stale.
    pub ticket: u64,
    /// Patch-local origin and extents in cube space.
    pub frame: PatchFrame,
    /// World-space patch centre; vertex positions are relative to it.
    pub centre: DVec3,
    /// Planet placement and datum radius.
    pub planet: PlanetFrame,
    /// Texture coordinate of the patch origin.
    pub uv_origin: DVec2,
    /// Texture-space extent of the patch; halves per level.
    pub uv_resolution: f64,
    /// The patch's error threshold.
    pub error_threshold: f64,
    /// Multiplier from the widest edge to the split distance.
    pub split_distance_factor: f64,
    /// Shared index list; its resolution is the build's target resolution.
    pub indices: Arc<IndexTemplate>,
    /// Height source.
    pub generator: Arc<dyn Generator>,
}

/// Output of a patch build.
#[derive(Clone, Debug)]
pub struct PatchGeometry {
    /// `resolution²` vertices, row-major along `s` then `t`.
    pub vertices: Vec<PatchVertex>,
    /// Index list the vertices are drawn with.
    pub indices: Arc<IndexTemplate>,
    /// Camera distance (past the bounding radius) under which this patch
    /// should be replaced by its children.
    pub increase_detail_distance: f64,
    /// Largest gap between this grid and the grid one level coarser, in
    /// world units. `None` when the resolution has no coarser sub-grid.
    pub max_error: Option<f64>,
}

impl BuildTask {
    /// Vertices along one patch edge.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.indices.resolution()
    }

    /// Synthesize the patch.
    ///
    /// The split distance is `widest_edge * split_distance_factor +
    /// max_error / error_threshold`.
    #[must_use]
    pub fn build(&self) -> PatchGeometry {
        let res = self.resolution() as usize;
        let step = 1.0 / (res - 1) as f64;
        let generator = self.generator.as_ref();

        let surface: Vec<DVec3> = (0..res * res)
            .map(|k| {
                let dir = self
                    .frame
                    .sphere_dir((k % res) as f64 * step, (k / res) as f64 * step);
                self.planet.surface_point(generator, dir)
            })
            .collect();

        let vertices = (0..res * res)
            .map(|k| {
                let (i, j) = (k % res, k / res);
                let uv = self.uv_origin + DVec2::new(i as f64, j as f64) * step * self.uv_resolution;
                PatchVertex {
                    position: (surface[k] - self.centre).as_vec3().to_array(),
                    normal: grid_normal(&surface, res, i, j, self.planet.centre)
                        .as_vec3()
                        .to_array(),
                    uv: uv.as_vec2().to_array(),
                }
            })
            .collect();

        let max_error = coarse_error(&surface, res);
        let increase_detail_distance = widest_edge(&surface, res) * self.split_distance_factor
            + max_error.unwrap_or(0.0) / self.error_threshold;

        PatchGeometry {
            vertices,
            indices: Arc::clone(&self.indices),
            increase_detail_distance,
            max_error,
        }
    }

    /// Build with the generator isolated: a panic becomes a faulted
    /// completion instead of unwinding through the caller.
    #[must_use]
    pub fn run(self) -> BuildCompletion {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.build())).map_err(panic_message);
        BuildCompletion {
            node: self.node,
            ticket: self.ticket,
            outcome,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Central-difference normal; falls back to the radial direction on a
/// degenerate grid.
fn grid_normal(surface: &[DVec3], res: usize, i: usize, j: usize, planet_centre: DVec3) -> DVec3 {
    let at = |i: usize, j: usize| surface[j * res + i];
    let du = at((i + 1).min(res - 1), j) - at(i.saturating_sub(1), j);
    let dv = at(i, (j + 1).min(res - 1)) - at(i, j.saturating_sub(1));
    du.cross(dv)
        .try_normalize()
        .unwrap_or_else(|| (at(i, j) - planet_centre).normalize_or_zero())
}

/// Max distance between each odd grid vertex and where the coarser grid
/// (even vertices, same diagonal split as [`IndexTemplate`]) would put it.
fn coarse_error(surface: &[DVec3], res: usize) -> Option<f64> {
    if res < 3 || res % 2 == 0 {
        return None;
    }
    let at = |i: usize, j: usize| surface[j * res + i];
    let mut worst = 0.0_f64;
    for j in 0..res {
        for i in 0..res {
            let predicted = match (i % 2, j % 2) {
                (0, 0) => continue,
                (1, 0) => (at(i - 1, j) + at(i + 1, j)) * 0.5,
                (0, 1) => (at(i, j - 1) + at(i, j + 1)) * 0.5,
                _ => (at(i - 1, j - 1) + at(i + 1, j + 1)) * 0.5,
            };
            worst = worst.max((at(i, j) - predicted).length());
        }
    }
    Some(worst)
}

fn widest_edge(surface: &[DVec3], res: usize) -> f64 {
    let last = res - 1;
    let c00 = surface[0];
    let c10 = surface[last];
    let c01 = surface[last * res];
    let c11 = surface[last * res + last];
    [(c00, c10), (c00, c01), (c10, c11), (c01, c11)]
        .iter()
        .map(|(a, b)| (*a - *b).length())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_cubesphere::{CubeFace, Quadrant};

    const RADIUS: f64 = 6_000.0;

    struct Ripple;

    impl Generator for Ripple {
        fn height(&self, p: DVec3) -> f32 {
            (20.0 * (p.x * 7.0).sin() * (p.z * 5.0).cos()) as f32
        }
    }

    struct Faulty;

    impl Generator for Faulty {
        fn height(&self, _p: DVec3) -> f32 {
            panic!("height field exploded")
        }
    }

    fn task(frame: PatchFrame, error_threshold: f64, resolution: u32) -> BuildTask {
        let planet = PlanetFrame::at_origin(RADIUS);
        BuildTask {
            node: NodeId(0),
            ticket: 1,
            frame,
            centre: planet.datum_point(frame.sphere_dir(0.5, 0.5)),
            planet,
            uv_origin: DVec2::ZERO,
            uv_resolution: 1.0,
            error_threshold,
            split_distance_factor: 1.5,
            indices: Arc::new(IndexTemplate::grid(resolution)),
            generator: Arc::new(Ripple),
        }
    }

    #[test]
    fn test_build_produces_full_grid() {
        let geometry = task(PatchFrame::root(CubeFace::PosY), 1.0, 9).build();
        assert_eq!(geometry.vertices.len(), 81);
        assert_eq!(geometry.indices.resolution(), 9);
        assert!(geometry.increase_detail_distance > 0.0);
        assert!(geometry.max_error.is_some());
    }

    #[test]
    fn test_build_is_deterministic() {
        let t = task(PatchFrame::root(CubeFace::NegX), 1.0, 5);
        let a = t.build();
        let b = t.build();
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.increase_detail_distance, b.increase_detail_distance);
    }

    #[test]
    fn test_positions_are_relative_to_patch_centre() {
        let frame = PatchFrame::root(CubeFace::PosZ).quadrant(Quadrant::TopLeft);
        let t = task(frame, 0.5, 5);
        let geometry = t.build();
        let centre_vertex = geometry.vertices[2 * 5 + 2].position;
        let offset = glam::Vec3::from_array(centre_vertex).length();
        assert!(offset < 30.0, "centre vertex should sit near the patch centre, got {offset}");
    }

    #[test]
    fn test_normals_point_outward() {
        let t = task(PatchFrame::root(CubeFace::NegZ), 1.0, 9);
        let geometry = t.build();
        for v in &geometry.vertices {
            let world = t.centre + glam::Vec3::from_array(v.position).as_dvec3();
            let normal = glam::Vec3::from_array(v.normal).as_dvec3();
            assert!((normal.length() - 1.0).abs() < 1e-4);
            assert!(normal.dot(world.normalize()) > 0.0, "normal faces into the planet");
        }
    }

    #[test]
    fn test_uv_spans_uv_resolution() {
        let mut t = task(PatchFrame::root(CubeFace::PosX), 1.0, 5);
        t.uv_origin = DVec2::new(0.5, 0.25);
        t.uv_resolution = 0.25;
        let geometry = t.build();
        assert_eq!(geometry.vertices[0].uv, [0.5, 0.25]);
        assert_eq!(geometry.vertices[24].uv, [0.75, 0.5]);
    }

    #[test]
    fn test_even_resolution_has_no_coarse_error() {
        let geometry = task(PatchFrame::root(CubeFace::PosY), 1.0, 4).build();
        assert_eq!(geometry.max_error, None);
    }

    #[test]
    fn test_split_distance_shrinks_with_depth() {
        let mut frame = PatchFrame::root(CubeFace::PosX);
        let mut threshold = 1.0;
        let mut previous = f64::INFINITY;
        for depth in 0..6 {
            let d = task(frame, threshold, 9).build().increase_detail_distance;
            assert!(d < previous, "depth {depth}: {d} should be below {previous}");
            previous = d;
            frame = frame.quadrant(Quadrant::TopRight);
            threshold *= 0.5;
        }
    }

    #[test]
    fn test_generator_panic_is_isolated() {
        let mut t = task(PatchFrame::root(CubeFace::PosY), 1.0, 5);
        t.generator = Arc::new(Faulty);
        let completion = t.run();
        assert_eq!(completion.node, NodeId(0));
        assert_eq!(completion.ticket, 1);
        let message = completion.outcome.expect_err("fault must surface as Err");
        assert!(message.contains("exploded"), "unexpected message {message}");
    }
}
