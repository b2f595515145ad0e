//! Quadtree patch nodes.
//!
//! Nodes live in the forest's slab and refer to each other by [`NodeId`];
//! the parent link is a plain index, never an owning reference.

use glam::{DVec2, DVec3};
use orbis_cubesphere::{PatchFrame, Quadrant, cube_to_unit_sphere};

use crate::{PatchGeometry, PlanetFrame, SlotIndex};

/// Index of a node in its forest's pool.
///
/// Ids are reused after a node is destroyed; build completions carry a
/// ticket as well so a reused id is never mistaken for the original node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Lifecycle state of a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Created, no build submitted yet.
    UnbuiltLeaf,
    /// A build is in flight, or its result is parked waiting for a slot.
    BuildingLeaf,
    /// Owns a slot and renders its own geometry.
    ReadyLeaf,
    /// Children render in its place.
    Internal,
    /// Children were moved to the cache; rebuilding its own geometry.
    MergingInternal,
}

/// One patch of the planet surface.
#[derive(Debug)]
pub struct PatchNode {
    pub(crate) frame: PatchFrame,
    pub(crate) depth: u8,
    pub(crate) centre: DVec3,
    pub(crate) radius: f64,
    pub(crate) error_threshold: f64,
    pub(crate) uv_origin: DVec2,
    pub(crate) uv_resolution: f64,
    pub(crate) increase_detail_distance: Option<f64>,
    pub(crate) slot: Option<SlotIndex>,
    pub(crate) geometry: Option<PatchGeometry>,
    pub(crate) parked: Option<PatchGeometry>,
    pub(crate) state: NodeState,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<[NodeId; 4]>,
    pub(crate) pending_children: Option<[NodeId; 4]>,
    pub(crate) cached_children: Option<[NodeId; 4]>,
    pub(crate) build_ticket: Option<u64>,
}

impl PatchNode {
    /// A root patch covering `frame`.
    pub(crate) fn root(frame: PatchFrame, planet: &PlanetFrame, error_threshold: f64) -> Self {
        Self::new(frame, planet, 0, error_threshold, DVec2::ZERO, 1.0, None)
    }

    /// The unbuilt child of `self` for `quadrant`.
    pub(crate) fn child(&self, quadrant: Quadrant, planet: &PlanetFrame, parent: NodeId) -> Self {
        let (ds, dt) = quadrant.offset();
        let uv_resolution = self.uv_resolution * 0.5;
        Self::new(
            self.frame.quadrant(quadrant),
            planet,
            self.depth + 1,
            self.error_threshold * 0.5,
            self.uv_origin + DVec2::new(ds, dt) * uv_resolution,
            uv_resolution,
            Some(parent),
        )
    }

    fn new(
        frame: PatchFrame,
        planet: &PlanetFrame,
        depth: u8,
        error_threshold: f64,
        uv_origin: DVec2,
        uv_resolution: f64,
        parent: Option<NodeId>,
    ) -> Self {
        let centre = planet.datum_point(frame.sphere_dir(0.5, 0.5));
        let radius = frame
            .corners()
            .iter()
            .map(|&c| (planet.datum_point(cube_to_unit_sphere(c)) - centre).length())
            .fold(0.0, f64::max);
        Self {
            frame,
            depth,
            centre,
            radius,
            error_threshold,
            uv_origin,
            uv_resolution,
            increase_detail_distance: None,
            slot: None,
            geometry: None,
            parked: None,
            state: NodeState::UnbuiltLeaf,
            parent,
            children: None,
            pending_children: None,
            cached_children: None,
            build_ticket: None,
        }
    }

    /// Camera distance past the bounding sphere, computed in `f64`.
    #[must_use]
    pub fn distance_to(&self, camera: DVec3) -> f64 {
        (camera - self.centre).length() - self.radius
    }

    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    #[must_use]
    pub fn frame(&self) -> &PatchFrame {
        &self.frame
    }

    /// World-space centre on the datum sphere.
    #[must_use]
    pub fn centre(&self) -> DVec3 {
        self.centre
    }

    /// Bounding radius around [`centre`](Self::centre); fixed for life.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    #[must_use]
    pub fn uv_resolution(&self) -> f64 {
        self.uv_resolution
    }

    /// Split distance from the last completed build, if any.
    #[must_use]
    pub fn increase_detail_distance(&self) -> Option<f64> {
        self.increase_detail_distance
    }

    #[must_use]
    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }

    /// Resident vertex data; present only for ready leaves.
    #[must_use]
    pub fn geometry(&self) -> Option<&PatchGeometry> {
        self.geometry.as_ref()
    }

    /// Whether a finished build is waiting for an arena slot.
    #[must_use]
    pub fn is_parked(&self) -> bool {
        self.parked.is_some()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.children
    }

    /// Children of a split that has not finished building.
    #[must_use]
    pub fn pending_children(&self) -> Option<[NodeId; 4]> {
        self.pending_children
    }

    /// Subtree retained from the last merge.
    #[must_use]
    pub fn cached_children(&self) -> Option<[NodeId; 4]> {
        self.cached_children
    }

    /// Ticket of the outstanding build, if one is in flight.
    #[must_use]
    pub fn build_ticket(&self) -> Option<u64> {
        self.build_ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_cubesphere::CubeFace;

    fn planet() -> PlanetFrame {
        PlanetFrame::at_origin(1_000.0)
    }

    #[test]
    fn test_root_starts_unbuilt() {
        let node = PatchNode::root(PatchFrame::root(CubeFace::PosX), &planet(), 1.0);
        assert_eq!(node.state(), NodeState::UnbuiltLeaf);
        assert_eq!(node.depth(), 0);
        assert!(node.slot().is_none());
        assert!(node.geometry().is_none());
        assert!((node.centre() - DVec3::new(1_000.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_child_halves_threshold_and_uv() {
        let p = planet();
        let root = PatchNode::root(PatchFrame::root(CubeFace::NegY), &p, 2.0);
        let child = root.child(Quadrant::TopRight, &p, NodeId(7));
        assert_eq!(child.error_threshold(), 1.0);
        assert_eq!(child.uv_resolution(), 0.5);
        assert_eq!(child.uv_origin, DVec2::new(0.5, 0.5));
        assert_eq!(child.parent(), Some(NodeId(7)));
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn test_child_radius_is_smaller_than_parent() {
        let p = planet();
        let root = PatchNode::root(PatchFrame::root(CubeFace::PosZ), &p, 1.0);
        for q in Quadrant::ALL {
            let child = root.child(q, &p, NodeId(0));
            assert!(
                child.radius() < root.radius(),
                "{q:?} child radius {} should be below {}",
                child.radius(),
                root.radius()
            );
        }
    }

    #[test]
    fn test_distance_is_past_bounding_sphere() {
        let node = PatchNode::root(PatchFrame::root(CubeFace::PosY), &planet(), 1.0);
        let camera = node.centre() + DVec3::Y * 5_000.0;
        let d = node.distance_to(camera);
        assert!((d - (5_000.0 - node.radius())).abs() < 1e-6);
        assert!(node.distance_to(node.centre()) < 0.0);
    }

    #[test]
    fn test_distance_keeps_precision_at_planet_scale() {
        let p = PlanetFrame::at_origin(6.371e6);
        let mut node = PatchNode::root(PatchFrame::root(CubeFace::PosX), &p, 1.0);
        for _ in 0..20 {
            node = node.child(Quadrant::BottomLeft, &p, NodeId(0));
        }
        let camera = node.centre() + node.centre().normalize() * (node.radius() + 0.25);
        let d = node.distance_to(camera);
        assert!((d - 0.25).abs() < 1e-3, "expected ~0.25, got {d}");
    }
}
