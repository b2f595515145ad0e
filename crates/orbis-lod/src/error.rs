//! Error types for the LOD core.

use crate::NodeId;

/// Errors surfaced by the LOD core.
///
/// Arena exhaustion is not an error: a patch that cannot get a slot
/// stays coarser until one frees up, it never fails the frame.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// The terrain generator panicked while building a patch.
    #[error("generator fault while building patch {node:?}: {message}")]
    GeneratorFault {
        /// The patch whose build faulted.
        node: NodeId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// Work was queued after the scheduler shut down its workers.
    #[error("build scheduler is shut down")]
    SchedulerClosed,

    /// The settings cannot describe a working forest.
    #[error("invalid lod settings: {0}")]
    InvalidSettings(String),
}
