//! The patch forest: every quadtree node of a planet in one slab, plus the
//! vertex arena their geometry lives in.
//!
//! All tree mutation and all slot ownership transfers happen here, on the
//! thread that owns the forest. Workers only ever see [`BuildTask`]
//! snapshots.

use std::sync::Arc;

use glam::DVec3;
use orbis_cubesphere::{CubeFace, PatchFrame, Quadrant};
use slab::Slab;

use crate::{
    BuildCompletion, BuildScheduler, BuildTask, Generator, IndexTemplate, LodError, LodSettings,
    LodStats, NodeId, NodeState, PatchDraw, PatchGeometry, PatchNode, PlanetFrame, RenderSink,
    SlotIndex, VertexArena,
};

/// Quadtrees over one planet, sharing one vertex arena.
pub struct PatchForest {
    nodes: Slab<PatchNode>,
    roots: Vec<NodeId>,
    arena: VertexArena,
    settings: LodSettings,
    planet: PlanetFrame,
    generator: Arc<dyn Generator>,
    indices: Arc<IndexTemplate>,
    indices_uploaded: bool,
    /// Nodes whose slot contents must be written before the next draw.
    uploads: Vec<NodeId>,
    next_ticket: u64,
    stale_completions: u64,
}

impl PatchForest {
    /// An empty forest. Plant roots with [`plant_root`](Self::plant_root)
    /// or [`plant_cube_faces`](Self::plant_cube_faces).
    pub fn new(
        settings: LodSettings,
        planet: PlanetFrame,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, LodError> {
        settings.validate()?;
        let arena = VertexArena::new(settings.arena_capacity, settings.vertices_per_patch());
        let indices = Arc::new(IndexTemplate::grid(settings.patch_resolution));
        Ok(Self {
            nodes: Slab::new(),
            roots: Vec::new(),
            arena,
            settings,
            planet,
            generator,
            indices,
            indices_uploaded: false,
            uploads: Vec::new(),
            next_ticket: 0,
            stale_completions: 0,
        })
    }

    /// Add an unbuilt root covering `frame`. It is built on the next
    /// [`bootstrap_roots`](Self::bootstrap_roots) or [`update`](Self::update).
    pub fn plant_root(&mut self, frame: PatchFrame) -> NodeId {
        let node = PatchNode::root(frame, &self.planet, self.settings.root_error_threshold);
        let id = NodeId(self.nodes.insert(node));
        self.roots.push(id);
        id
    }

    /// One root per cube face.
    pub fn plant_cube_faces(&mut self) -> Vec<NodeId> {
        let ids: Vec<_> = CubeFace::ALL
            .into_iter()
            .map(|face| self.plant_root(PatchFrame::root(face)))
            .collect();
        tracing::info!(
            radius = self.planet.radius,
            slots = self.arena.capacity(),
            resolution = self.settings.patch_resolution,
            "planted cube-sphere forest"
        );
        ids
    }

    /// Build every unbuilt root on the calling thread.
    ///
    /// This is the only place the owner blocks on a build: a fresh root has
    /// no coarser geometry to show while it waits.
    pub fn bootstrap_roots(&mut self) -> Result<(), LodError> {
        let unbuilt: Vec<_> = self
            .roots
            .iter()
            .copied()
            .filter(|id| self.nodes[id.0].state == NodeState::UnbuiltLeaf)
            .collect();
        for id in unbuilt {
            let task = self.start_build(id, NodeState::BuildingLeaf);
            tracing::debug!(node = ?id, "bootstrapping root patch");
            self.on_build_complete(task.run())?;
        }
        Ok(())
    }

    /// Apply one drained completion.
    ///
    /// Completions for destroyed nodes, or carrying a ticket the node is no
    /// longer waiting on, are counted and dropped without touching the
    /// arena. A generator fault is returned as an error.
    pub fn on_build_complete(&mut self, completion: BuildCompletion) -> Result<(), LodError> {
        let BuildCompletion {
            node: id,
            ticket,
            outcome,
        } = completion;
        let Some(node) = self.nodes.get_mut(id.0) else {
            self.stale_completions += 1;
            tracing::warn!(node = ?id, ticket, "dropping completion for a destroyed patch");
            return Ok(());
        };
        if node.build_ticket != Some(ticket) {
            self.stale_completions += 1;
            tracing::warn!(
                node = ?id,
                ticket,
                expected = ?node.build_ticket,
                "dropping stale patch completion"
            );
            return Ok(());
        }
        node.build_ticket = None;

        let geometry = match outcome {
            Ok(geometry) => geometry,
            Err(message) => {
                tracing::error!(node = ?id, %message, "generator fault");
                return Err(LodError::GeneratorFault { node: id, message });
            }
        };

        if node.state == NodeState::MergingInternal
            && let Some(cached) = node.cached_children
        {
            // The merged subtree stops rendering now; its slots go back
            // before the parent asks for one.
            for child in cached {
                self.release_subtree_slots(child);
            }
        }
        self.accept_geometry(id, geometry);
        Ok(())
    }

    /// Split and merge patches against the camera position.
    pub fn update_lod(
        &mut self,
        camera: DVec3,
        scheduler: &mut dyn BuildScheduler,
    ) -> Result<(), LodError> {
        for root in self.roots.clone() {
            self.update_node_lod(root, camera, scheduler)?;
        }
        Ok(())
    }

    /// Secondary pass: build unbuilt roots, then retry slot allocation for
    /// finished patches that were parked on an exhausted arena.
    pub fn update(&mut self) -> Result<(), LodError> {
        self.bootstrap_roots()?;

        let parked: Vec<_> = self
            .live_nodes()
            .into_iter()
            .filter(|id| self.nodes[id.0].parked.is_some())
            .collect();
        for id in parked {
            let Some(slot) = self.arena.allocate() else {
                break;
            };
            let Some(geometry) = self.nodes[id.0].parked.take() else {
                self.arena.deallocate(slot);
                continue;
            };
            tracing::debug!(node = ?id, ?slot, "parked patch got a slot");
            self.install(id, slot, geometry);
        }
        Ok(())
    }

    /// Upload pending slot contents, then draw every rendered leaf.
    /// Returns the number of draws issued.
    ///
    /// A node mid-transition with neither a slot nor drawable children
    /// draws nothing this frame.
    pub fn render(&mut self, sink: &mut dyn RenderSink) -> usize {
        if !self.indices_uploaded {
            sink.write_indices(self.indices.indices());
            self.indices_uploaded = true;
        }
        for id in self.uploads.drain(..) {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            let (Some(slot), Some(geometry)) = (node.slot, node.geometry.as_ref()) else {
                continue;
            };
            let first_vertex = self.arena.slot_range(slot).start as u32;
            sink.write_vertices(slot, first_vertex, bytemuck::cast_slice(&geometry.vertices));
        }
        self.roots
            .iter()
            .map(|&root| self.draw_node(root, sink))
            .sum()
    }

    /// Whether `id` may merge: it is internal and nothing below it is
    /// building, merging, or waiting on a split.
    #[must_use]
    pub fn can_reduce_detail(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id.0) else {
            return false;
        };
        node.state == NodeState::Internal
            && node
                .children
                .is_some_and(|children| children.iter().all(|&c| self.is_settled(c)))
    }

    /// Destroy every node and return every slot to the arena.
    pub fn refresh(&mut self) {
        let released = self.arena.allocated_count();
        for root in std::mem::take(&mut self.roots) {
            self.destroy_subtree(root);
        }
        self.uploads.clear();
        debug_assert_eq!(self.arena.allocated_count(), 0, "refresh leaked arena slots");
        tracing::info!(released, "forest refreshed");
    }

    /// Accounting snapshot. `pending_builds` comes from the scheduler.
    #[must_use]
    pub fn stats(&self, pending_builds: usize) -> LodStats {
        let live = self.live_nodes();
        let mut stats = LodStats {
            nodes: self.nodes.len(),
            cached_nodes: self.nodes.len() - live.len(),
            allocated_slots: self.arena.allocated_count(),
            free_slots: self.arena.free_count(),
            pending_builds,
            stale_completions: self.stale_completions,
            ..Default::default()
        };
        for id in live {
            let node = &self.nodes[id.0];
            match node.state {
                NodeState::UnbuiltLeaf => {}
                NodeState::BuildingLeaf => stats.building_leaves += 1,
                NodeState::ReadyLeaf => stats.ready_leaves += 1,
                NodeState::Internal => stats.internal += 1,
                NodeState::MergingInternal => stats.merging += 1,
            }
            if node.parked.is_some() {
                stats.parked += 1;
            }
        }
        stats
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&PatchNode> {
        self.nodes.get(id.0)
    }

    /// Every node in the pool, cached subtrees included.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PatchNode)> + '_ {
        self.nodes.iter().map(|(key, node)| (NodeId(key), node))
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn arena(&self) -> &VertexArena {
        &self.arena
    }

    #[must_use]
    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    #[must_use]
    pub fn planet(&self) -> &PlanetFrame {
        &self.planet
    }

    #[must_use]
    pub fn stale_completions(&self) -> u64 {
        self.stale_completions
    }

    fn update_node_lod(
        &mut self,
        id: NodeId,
        camera: DVec3,
        scheduler: &mut dyn BuildScheduler,
    ) -> Result<(), LodError> {
        let node = &self.nodes[id.0];
        let distance = node.distance_to(camera);
        let state = node.state;
        match state {
            NodeState::ReadyLeaf => match node.pending_children {
                None => {
                    if node.depth < self.settings.max_depth
                        && node.increase_detail_distance.is_some_and(|d| distance < d)
                    {
                        self.increase_detail(id, scheduler)?;
                    }
                }
                Some(pending) => {
                    if node.increase_detail_distance.is_some_and(|d| distance > d)
                        && self.split_is_stalled(&pending)
                    {
                        self.abandon_split(id);
                    }
                }
            },
            NodeState::Internal => {
                let children = node.children;
                if node.increase_detail_distance.is_some_and(|d| distance > d)
                    && self.can_reduce_detail(id)
                {
                    self.reduce_detail(id, scheduler)?;
                } else if let Some(children) = children {
                    for child in children {
                        self.update_node_lod(child, camera, scheduler)?;
                    }
                }
            }
            NodeState::UnbuiltLeaf | NodeState::BuildingLeaf | NodeState::MergingInternal => {}
        }
        Ok(())
    }

    fn increase_detail(
        &mut self,
        id: NodeId,
        scheduler: &mut dyn BuildScheduler,
    ) -> Result<(), LodError> {
        if self.nodes[id.0].cached_children.is_some() {
            self.split_from_cache(id);
            return Ok(());
        }
        if scheduler.pending_count() >= self.settings.max_pending_builds {
            tracing::trace!(node = ?id, "split deferred, build queue is full");
            return Ok(());
        }

        let children = Quadrant::ALL.map(|quadrant| {
            let child = self.nodes[id.0].child(quadrant, &self.planet, id);
            NodeId(self.nodes.insert(child))
        });
        self.nodes[id.0].pending_children = Some(children);
        tracing::debug!(node = ?id, depth = self.nodes[id.0].depth, "splitting patch");
        for child in children {
            let task = self.start_build(child, NodeState::BuildingLeaf);
            scheduler.queue_work(task)?;
        }
        Ok(())
    }

    /// Relink a cached subtree. Every cached leaf needs a slot again; if
    /// the arena cannot supply all of them nothing changes.
    fn split_from_cache(&mut self, id: NodeId) {
        let Some(cached) = self.nodes[id.0].cached_children else {
            return;
        };
        let leaves = self.subtree_leaves(&cached);
        let mut granted = Vec::with_capacity(leaves.len());
        for _ in &leaves {
            match self.arena.allocate() {
                Some(slot) => granted.push(slot),
                None => {
                    for slot in granted {
                        self.arena.deallocate(slot);
                    }
                    // Retried every frame while the camera stays close.
                    tracing::debug!(
                        node = ?id,
                        leaves = leaves.len(),
                        "no room to restore cached patches"
                    );
                    return;
                }
            }
        }
        for (leaf, slot) in leaves.into_iter().zip(granted) {
            self.nodes[leaf.0].slot = Some(slot);
            self.uploads.push(leaf);
        }

        let node = &mut self.nodes[id.0];
        node.children = node.cached_children.take();
        node.state = NodeState::Internal;
        node.geometry = None;
        if let Some(slot) = node.slot.take() {
            self.arena.deallocate(slot);
        }
        tracing::debug!(node = ?id, "split restored from cache");
    }

    /// Every pending child has finished building but at least one is still
    /// parked without a slot.
    fn split_is_stalled(&self, pending: &[NodeId; 4]) -> bool {
        pending
            .iter()
            .all(|c| self.nodes[c.0].build_ticket.is_none())
    }

    /// Drop a stalled split the camera no longer wants, returning the
    /// slots its ready children took. Nothing is in flight for them, so no
    /// completion can arrive for the destroyed nodes.
    fn abandon_split(&mut self, id: NodeId) {
        let Some(pending) = self.nodes[id.0].pending_children.take() else {
            return;
        };
        for child in pending {
            self.destroy_subtree(child);
        }
        tracing::debug!(node = ?id, "abandoned stalled split");
    }

    /// Move the children into the cache and rebuild this node's geometry.
    fn reduce_detail(
        &mut self,
        id: NodeId,
        scheduler: &mut dyn BuildScheduler,
    ) -> Result<(), LodError> {
        let Some(children) = self.nodes[id.0].children.take() else {
            return Ok(());
        };
        for child in children {
            self.drop_nested_caches(child);
        }
        self.nodes[id.0].cached_children = Some(children);
        tracing::debug!(node = ?id, depth = self.nodes[id.0].depth, "merging patch");
        let task = self.start_build(id, NodeState::MergingInternal);
        scheduler.queue_work(task)
    }

    fn start_build(&mut self, id: NodeId, state: NodeState) -> BuildTask {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let node = &mut self.nodes[id.0];
        node.build_ticket = Some(ticket);
        node.state = state;
        BuildTask {
            node: id,
            ticket,
            frame: node.frame,
            centre: node.centre,
            planet: self.planet,
            uv_origin: node.uv_origin,
            uv_resolution: node.uv_resolution,
            error_threshold: node.error_threshold,
            split_distance_factor: self.settings.split_distance_factor,
            indices: Arc::clone(&self.indices),
            generator: Arc::clone(&self.generator),
        }
    }

    fn accept_geometry(&mut self, id: NodeId, geometry: PatchGeometry) {
        match self.arena.allocate() {
            Some(slot) => self.install(id, slot, geometry),
            None => {
                tracing::warn!(node = ?id, "vertex arena exhausted, parking finished patch");
                self.nodes[id.0].parked = Some(geometry);
            }
        }
    }

    fn install(&mut self, id: NodeId, slot: SlotIndex, geometry: PatchGeometry) {
        let node = &mut self.nodes[id.0];
        node.slot = Some(slot);
        node.increase_detail_distance = Some(geometry.increase_detail_distance);
        node.geometry = Some(geometry);
        node.parked = None;
        node.state = NodeState::ReadyLeaf;
        let parent = node.parent;
        self.uploads.push(id);
        if let Some(parent) = parent {
            self.try_complete_split(parent);
        }
    }

    /// Once every pending child is ready the parent hands over to them.
    fn try_complete_split(&mut self, id: NodeId) {
        let Some(pending) = self.nodes[id.0].pending_children else {
            return;
        };
        if !pending
            .iter()
            .all(|c| self.nodes[c.0].state == NodeState::ReadyLeaf)
        {
            return;
        }
        let node = &mut self.nodes[id.0];
        node.pending_children = None;
        node.children = Some(pending);
        node.state = NodeState::Internal;
        node.geometry = None;
        if let Some(slot) = node.slot.take() {
            self.arena.deallocate(slot);
        }
        tracing::debug!(node = ?id, "split complete");
    }

    fn is_settled(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        match node.state {
            NodeState::ReadyLeaf => node.pending_children.is_none(),
            NodeState::Internal => node
                .children
                .is_some_and(|children| children.iter().all(|&c| self.is_settled(c))),
            NodeState::UnbuiltLeaf | NodeState::BuildingLeaf | NodeState::MergingInternal => false,
        }
    }

    /// Return the slots of every leaf under `id`. Leaves keep their
    /// vertex data so a later re-split can restore them.
    fn release_subtree_slots(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        let children = node.children;
        if let Some(slot) = node.slot.take() {
            self.arena.deallocate(slot);
        }
        for child in children.into_iter().flatten() {
            self.release_subtree_slots(child);
        }
    }

    fn drop_nested_caches(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        let children = node.children;
        if let Some(cached) = node.cached_children.take() {
            for child in cached {
                self.destroy_subtree(child);
            }
        }
        if let Some(children) = children {
            for child in children {
                self.drop_nested_caches(child);
            }
        }
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.try_remove(id.0) else {
            return;
        };
        if let Some(slot) = node.slot {
            self.arena.deallocate(slot);
        }
        for group in [node.children, node.pending_children, node.cached_children]
            .into_iter()
            .flatten()
        {
            for child in group {
                self.destroy_subtree(child);
            }
        }
    }

    /// Ready leaves under `roots`, following rendered children only.
    fn subtree_leaves(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = roots.to_vec();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            match node.children {
                Some(children) => stack.extend(children),
                None if node.state == NodeState::ReadyLeaf => leaves.push(id),
                None => {}
            }
        }
        leaves
    }

    /// Nodes reachable from the roots through children and pending
    /// children; cached subtrees are excluded.
    fn live_nodes(&self) -> Vec<NodeId> {
        let mut live = Vec::new();
        let mut stack = self.roots.clone();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            stack.extend(node.children.into_iter().flatten());
            stack.extend(node.pending_children.into_iter().flatten());
            live.push(id);
        }
        live
    }

    fn draw_node(&self, id: NodeId, sink: &mut dyn RenderSink) -> usize {
        let node = &self.nodes[id.0];
        if let (Some(slot), Some(_)) = (node.slot, node.geometry.as_ref()) {
            sink.draw_patch(&PatchDraw {
                node: id,
                slot,
                first_vertex: self.arena.slot_range(slot).start as u32,
                vertex_count: self.arena.vertices_per_slot() as u32,
                index_count: self.indices.index_count(),
                origin: node.centre,
                depth: node.depth,
            });
            return 1;
        }
        // A merging node keeps showing its cached children until its own
        // rebuild lands and their slots are released.
        let children = match node.state {
            NodeState::MergingInternal => node.cached_children,
            _ => node.children,
        };
        children
            .into_iter()
            .flatten()
            .map(|child| self.draw_node(child, sink))
            .sum()
    }
}
