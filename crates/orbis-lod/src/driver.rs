//! Per-frame orchestration of a patch forest and its build scheduler.

use std::sync::Arc;

use crate::{
    BuildScheduler, Camera, Generator, LodError, LodSettings, LodStats, PatchForest, PlanetFrame,
    RenderSink, VertexArena,
};

/// What one [`LodDriver::frame`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Completions drained and applied.
    pub completions: usize,
    /// Leaves drawn.
    pub draws: usize,
    /// Builds still outstanding after the frame.
    pub pending: usize,
}

/// Owns a forest and the scheduler its builds run on.
///
/// Each frame, in order: drain completions, update LOD against the camera,
/// run the secondary update pass, render.
pub struct LodDriver<S: BuildScheduler> {
    forest: PatchForest,
    scheduler: S,
}

impl<S: BuildScheduler> LodDriver<S> {
    /// A six-face cube-sphere planet. Every face root is built before this
    /// returns.
    pub fn new(
        settings: LodSettings,
        planet: PlanetFrame,
        generator: Arc<dyn Generator>,
        scheduler: S,
    ) -> Result<Self, LodError> {
        let mut forest = PatchForest::new(settings, planet, generator)?;
        forest.plant_cube_faces();
        Self::with_forest(forest, scheduler)
    }

    /// Drive an existing forest. Unbuilt roots are built before this
    /// returns.
    pub fn with_forest(mut forest: PatchForest, scheduler: S) -> Result<Self, LodError> {
        forest.bootstrap_roots()?;
        Ok(Self { forest, scheduler })
    }

    /// Run one frame.
    ///
    /// Every drained completion is applied even if an earlier one faulted;
    /// the first fault is then returned and the rest of the frame skipped.
    pub fn frame(
        &mut self,
        camera: &dyn Camera,
        sink: &mut dyn RenderSink,
    ) -> Result<FrameReport, LodError> {
        let completions = self.scheduler.drain_completions();
        let drained = completions.len();
        let mut fault = None;
        for completion in completions {
            if let Err(err) = self.forest.on_build_complete(completion)
                && fault.is_none()
            {
                fault = Some(err);
            }
        }
        if let Some(err) = fault {
            return Err(err);
        }

        self.forest.update_lod(camera.position(), &mut self.scheduler)?;
        self.forest.update()?;
        let draws = self.forest.render(sink);

        let report = FrameReport {
            completions: drained,
            draws,
            pending: self.scheduler.pending_count(),
        };
        tracing::trace!(?report, "lod frame");
        Ok(report)
    }

    /// Release every slot and clear the roots.
    pub fn refresh(&mut self) {
        self.forest.refresh();
    }

    #[must_use]
    pub fn stats(&self) -> LodStats {
        self.forest.stats(self.scheduler.pending_count())
    }

    #[must_use]
    pub fn forest(&self) -> &PatchForest {
        &self.forest
    }

    /// Mutable access, e.g. to plant new roots after a refresh.
    pub fn forest_mut(&mut self) -> &mut PatchForest {
        &mut self.forest
    }

    #[must_use]
    pub fn arena(&self) -> &VertexArena {
        self.forest.arena()
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
