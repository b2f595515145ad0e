//! Adaptive quadtree level-of-detail for planet terrain.
//!
//! Each cube face is a root [`PatchNode`]. Every frame the [`LodDriver`]
//! drains finished patch builds from a [`BuildScheduler`], walks the
//! forest splitting patches the camera is close to and merging patches it
//! has moved away from, and draws one arena slot per rendered leaf.
//!
//! Mesh synthesis ([`BuildTask::build`]) runs on worker threads against an
//! immutable snapshot; the forest, its [`VertexArena`], and all slot
//! ownership transfers stay on the thread that owns the driver.

mod arena;
mod build;
mod driver;
mod error;
mod forest;
mod generator;
mod node;
mod render;
mod scheduler;
mod settings;
mod stats;
mod vertex;

pub use arena::{SlotIndex, VertexArena};
pub use build::{BuildTask, PatchGeometry};
pub use driver::{FrameReport, LodDriver};
pub use error::LodError;
pub use forest::PatchForest;
pub use generator::{Generator, PlanetFrame};
pub use node::{NodeId, NodeState, PatchNode};
pub use render::{Camera, PatchDraw, RenderSink};
pub use scheduler::{BuildCompletion, BuildScheduler, InlineScheduler, ThreadedScheduler};
pub use settings::LodSettings;
pub use stats::LodStats;
pub use vertex::{IndexTemplate, PatchVertex};
