//! [`Generator`] implementations.

use glam::DVec3;
use orbis_lod::Generator;

use crate::{HeightmapParams, HeightmapSampler};

/// How normalized noise maps to terrain height, in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainHeightConfig {
    /// Lowest terrain relative to sea level (negative for ocean floor).
    pub min_height: f64,
    /// Highest terrain relative to sea level.
    pub max_height: f64,
    /// Sea level as an offset from the planet radius.
    pub sea_level: f64,
}

impl Default for TerrainHeightConfig {
    fn default() -> Self {
        Self {
            min_height: -2_000.0,
            max_height: 8_000.0,
            sea_level: 0.0,
        }
    }
}

/// Noise terrain on a sphere.
pub struct PlanetGenerator {
    heightmap: HeightmapSampler,
    config: TerrainHeightConfig,
}

impl PlanetGenerator {
    pub fn new(params: HeightmapParams, config: TerrainHeightConfig) -> Self {
        Self {
            heightmap: HeightmapSampler::new(params),
            config,
        }
    }

    /// Height above sea level at a unit-sphere direction, clamped to the
    /// configured range.
    pub fn sample_height(&self, dir: DVec3) -> f64 {
        let max_amp = self.heightmap.max_amplitude();
        if max_amp == 0.0 {
            return (self.config.min_height + self.config.max_height) * 0.5;
        }
        let normalized = (self.heightmap.sample_3d(dir) / max_amp + 1.0) * 0.5;
        let height =
            self.config.min_height + normalized * (self.config.max_height - self.config.min_height);
        height.clamp(self.config.min_height, self.config.max_height)
    }

    pub fn config(&self) -> &TerrainHeightConfig {
        &self.config
    }
}

impl Generator for PlanetGenerator {
    fn height(&self, point: DVec3) -> f32 {
        self.sample_height(point) as f32
    }

    fn ground_offset(&self, _point: DVec3) -> f32 {
        self.config.sea_level as f32
    }
}

/// Constant-height terrain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGenerator {
    pub height: f32,
}

impl Generator for FlatGenerator {
    fn height(&self, _point: DVec3) -> f32 {
        self.height
    }
}
