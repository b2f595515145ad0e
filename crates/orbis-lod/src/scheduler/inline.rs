//! Synchronous scheduler for deterministic tests and tools.

use super::{BuildCompletion, BuildScheduler};
use crate::{BuildTask, LodError, NodeId};

/// Runs builds on the calling thread.
///
/// In the default mode every task is built inside `queue_work` and its
/// completion handed out on the next drain. In held mode tasks are parked
/// untouched until a test releases them, in whatever order it likes.
#[derive(Default)]
pub struct InlineScheduler {
    hold: bool,
    held: Vec<BuildTask>,
    ready: Vec<BuildCompletion>,
}

impl InlineScheduler {
    /// Build every task as soon as it is queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park every task until [`release_all`](Self::release_all) or
    /// [`release_where`](Self::release_where).
    #[must_use]
    pub fn held() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    /// Switch between held and immediate mode. Already parked tasks stay
    /// parked.
    pub fn set_held(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Build every parked task.
    pub fn release_all(&mut self) -> usize {
        self.release_where(|_| true)
    }

    /// Build the parked tasks `pred` accepts; the rest stay parked.
    pub fn release_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&BuildTask) -> bool,
    {
        let (release, keep): (Vec<_>, Vec<_>) = self.held.drain(..).partition(|t| pred(t));
        self.held = keep;
        let released = release.len();
        self.ready.extend(release.into_iter().map(BuildTask::run));
        released
    }

    /// Number of parked tasks.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Nodes whose tasks are parked, in queue order.
    #[must_use]
    pub fn parked_nodes(&self) -> Vec<NodeId> {
        self.held.iter().map(|t| t.node).collect()
    }
}

impl BuildScheduler for InlineScheduler {
    fn queue_work(&mut self, task: BuildTask) -> Result<(), LodError> {
        if self.hold {
            self.held.push(task);
        } else {
            self.ready.push(task.run());
        }
        Ok(())
    }

    fn drain_completions(&mut self) -> Vec<BuildCompletion> {
        std::mem::take(&mut self.ready)
    }

    fn pending_count(&self) -> usize {
        self.held.len() + self.ready.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{DVec2, DVec3};
    use orbis_cubesphere::{CubeFace, PatchFrame};

    use super::*;
    use crate::{Generator, IndexTemplate, PlanetFrame};

    struct Flat;

    impl Generator for Flat {
        fn height(&self, _p: DVec3) -> f32 {
            0.0
        }
    }

    fn task(node: usize) -> BuildTask {
        let planet = PlanetFrame::at_origin(10.0);
        let frame = PatchFrame::root(CubeFace::PosY);
        BuildTask {
            node: NodeId(node),
            ticket: 0,
            frame,
            centre: planet.datum_point(frame.sphere_dir(0.5, 0.5)),
            planet,
            uv_origin: DVec2::ZERO,
            uv_resolution: 1.0,
            error_threshold: 1.0,
            split_distance_factor: 1.5,
            indices: Arc::new(IndexTemplate::grid(3)),
            generator: Arc::new(Flat),
        }
    }

    #[test]
    fn test_immediate_mode_completes_on_next_drain() {
        let mut scheduler = InlineScheduler::new();
        scheduler.queue_work(task(1)).expect("inline queue never fails");
        scheduler.queue_work(task(2)).expect("inline queue never fails");
        assert_eq!(scheduler.pending_count(), 2);
        let done = scheduler.drain_completions();
        assert_eq!(done.len(), 2);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(scheduler.drain_completions().is_empty());
    }

    #[test]
    fn test_held_mode_releases_selectively() {
        let mut scheduler = InlineScheduler::held();
        for i in 0..4 {
            scheduler.queue_work(task(i)).expect("inline queue never fails");
        }
        assert!(scheduler.drain_completions().is_empty());
        assert_eq!(scheduler.held_count(), 4);

        let released = scheduler.release_where(|t| t.node.0 % 2 == 1);
        assert_eq!(released, 2);
        assert_eq!(scheduler.parked_nodes(), vec![NodeId(0), NodeId(2)]);
        assert_eq!(scheduler.pending_count(), 4);

        let nodes: Vec<_> = scheduler.drain_completions().iter().map(|c| c.node).collect();
        assert_eq!(nodes, vec![NodeId(1), NodeId(3)]);
        assert_eq!(scheduler.release_all(), 2);
        assert_eq!(scheduler.drain_completions().len(), 2);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
