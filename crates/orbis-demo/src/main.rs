//! Headless fly-in over a procedural planet.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p orbis-demo -- --frames 300 --workers 4`.

mod sink;

use std::sync::Arc;

use clap::Parser;
use glam::DVec3;
use orbis_config::{CliArgs, Config, default_config_dir};
use orbis_lod::{LodDriver, LodError, LodSettings, PlanetFrame, ThreadedScheduler};
use orbis_terrain::{HeightmapParams, PlanetGenerator, TerrainHeightConfig};
use tracing::{error, info};

use crate::sink::CountingSink;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| ".orbis".into());

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    orbis_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = run(&config) {
        error!("demo aborted: {e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), LodError> {
    let planet = PlanetFrame::at_origin(config.planet.radius_m);
    let generator = PlanetGenerator::new(
        HeightmapParams {
            seed: config.planet.seed,
            octaves: config.planet.octaves,
            base_frequency: config.planet.base_frequency,
            ..Default::default()
        },
        TerrainHeightConfig {
            min_height: config.planet.min_height_m,
            max_height: config.planet.max_height_m,
            ..Default::default()
        },
    );

    let scheduler = match config.lod.worker_threads {
        0 => ThreadedScheduler::with_defaults(config.lod.completion_capacity),
        n => ThreadedScheduler::new(n, config.lod.completion_capacity),
    };
    info!(
        "radius={} m, {} build workers, {} slots of {} vertices",
        planet.radius,
        scheduler.worker_count(),
        config.lod.arena_capacity,
        config.lod.patch_resolution * config.lod.patch_resolution
    );

    let mut driver = LodDriver::new(lod_settings(config), planet, Arc::new(generator), scheduler)?;
    let mut sink = CountingSink::default();
    let frames = config.demo.frames.max(1);

    for frame in 0..frames {
        let camera = camera_at(config, frame, frames);
        sink.begin_frame();
        let report = driver.frame(&camera, &mut sink)?;

        if config.demo.stats_interval > 0 && frame % config.demo.stats_interval == 0 {
            info!(
                "frame {frame}: altitude={:.1} m draws={} completions={} {}",
                camera.length() - planet.radius,
                report.draws,
                report.completions,
                driver.stats()
            );
        }
    }

    let stats = driver.stats();
    info!(
        "flight done: {} draws of {} indices on the last frame, {} vertex uploads ({} KiB) in total, {}",
        sink.draws,
        sink.index_count,
        sink.uploads,
        sink.uploaded_bytes / 1024,
        stats
    );

    driver.refresh();
    info!("released every patch, {} slots free", driver.arena().free_count());
    driver.scheduler_mut().shutdown();
    Ok(())
}

fn lod_settings(config: &Config) -> LodSettings {
    LodSettings {
        arena_capacity: config.lod.arena_capacity,
        patch_resolution: config.lod.patch_resolution,
        max_depth: config.lod.max_depth,
        root_error_threshold: config.lod.root_error_threshold,
        split_distance_factor: config.lod.split_distance_factor,
        max_pending_builds: config.lod.max_pending_builds,
    }
}

/// Camera on a descending path toward a point on the +Y face. Altitude
/// falls geometrically so every LOD level gets a few frames.
fn camera_at(config: &Config, frame: u32, frames: u32) -> DVec3 {
    let start = config.demo.start_altitude_m.max(1.0);
    let end = config.demo.end_altitude_m.max(1.0);
    let t = if frames > 1 {
        f64::from(frame) / f64::from(frames - 1)
    } else {
        1.0
    };
    let altitude = start * (end / start).powf(t);
    let dir = DVec3::new(0.2 * (1.0 - t), 1.0, 0.1).normalize();
    dir * (config.planet.radius_m + altitude)
}
