//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Planet shape and terrain.
    pub planet: PlanetConfig,
    /// Level-of-detail streaming.
    pub lod: LodConfig,
    /// Headless fly-in demo.
    pub demo: DemoConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet shape and terrain noise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Planet radius in meters.
    pub radius_m: f64,
    /// Terrain seed.
    pub seed: u64,
    /// Lowest terrain relative to sea level, in meters.
    pub min_height_m: f64,
    /// Highest terrain relative to sea level, in meters.
    pub max_height_m: f64,
    /// Noise octaves.
    pub octaves: u32,
    /// Frequency of the broadest noise octave over the unit sphere.
    pub base_frequency: f64,
}

/// Level-of-detail streaming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Patch slots in the shared vertex buffer.
    pub arena_capacity: usize,
    /// Vertices along each patch edge.
    pub patch_resolution: u32,
    /// Deepest subdivision level.
    pub max_depth: u8,
    /// Error threshold of a root patch; halves at every level.
    pub root_error_threshold: f64,
    /// Multiplier from a patch's widest edge to its split distance.
    pub split_distance_factor: f64,
    /// Fresh splits wait while this many builds are outstanding.
    pub max_pending_builds: usize,
    /// Build worker threads (0 = derive from CPU count).
    pub worker_threads: usize,
    /// Finished builds that may wait for the next frame before workers
    /// stall.
    pub completion_capacity: usize,
}

/// Headless fly-in demo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Frames to simulate.
    pub frames: u32,
    /// Camera altitude above the datum on the first frame, in meters.
    pub start_altitude_m: f64,
    /// Camera altitude on the last frame, in meters.
    pub end_altitude_m: f64,
    /// Log LOD statistics every this many frames.
    pub stats_interval: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            radius_m: 200_000.0,
            seed: 0,
            min_height_m: -500.0,
            max_height_m: 2_000.0,
            octaves: 8,
            base_frequency: 1.5,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 1024,
            patch_resolution: 17,
            max_depth: 14,
            root_error_threshold: 1.0,
            split_distance_factor: 1.5,
            max_pending_builds: 64,
            worker_threads: 0,
            completion_capacity: 256,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            start_altitude_m: 400_000.0,
            end_altitude_m: 50.0,
            stats_interval: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Per-user config directory, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("orbis"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read_file(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read_file(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}
