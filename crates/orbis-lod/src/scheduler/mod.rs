//! Build dispatch: patch builds go out to workers, results come back to the
//! owning thread once per frame.

mod inline;
mod threaded;

pub use inline::InlineScheduler;
pub use threaded::ThreadedScheduler;

use crate::{BuildTask, LodError, NodeId, PatchGeometry};

/// A finished build on its way back to the forest.
#[derive(Debug)]
pub struct BuildCompletion {
    /// Patch the task was queued for.
    pub node: NodeId,
    /// Ticket the task was queued with.
    pub ticket: u64,
    /// The geometry, or the generator's panic message.
    pub outcome: Result<PatchGeometry, String>,
}

/// Dispatches [`BuildTask`]s and hands their results back.
///
/// Completions may come back in any order. The scheduler never calls into
/// the forest; the owner drains it and applies each completion itself.
pub trait BuildScheduler {
    /// Submit a task and count it as pending.
    fn queue_work(&mut self, task: BuildTask) -> Result<(), LodError>;

    /// Take every completion that has arrived so far. Each one drained
    /// stops counting as pending.
    fn drain_completions(&mut self) -> Vec<BuildCompletion>;

    /// Tasks queued but not yet drained.
    fn pending_count(&self) -> usize;
}
