//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orbis command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orbis", about = "Planet terrain LOD streaming demo")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Patch slots in the shared vertex buffer.
    #[arg(long)]
    pub arena_capacity: Option<usize>,

    /// Vertices along each patch edge.
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Deepest subdivision level.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Build worker threads (0 = derive from CPU count).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(radius) = args.radius {
            self.planet.radius_m = radius;
        }
        if let Some(capacity) = args.arena_capacity {
            self.lod.arena_capacity = capacity;
        }
        if let Some(resolution) = args.resolution {
            self.lod.patch_resolution = resolution;
        }
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if let Some(workers) = args.workers {
            self.lod.worker_threads = workers;
        }
        if let Some(frames) = args.frames {
            self.demo.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
