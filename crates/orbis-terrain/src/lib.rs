//! Planet terrain height sources for the LOD core.

mod heightmap;
mod planet;

pub use heightmap::{HeightmapParams, HeightmapSampler};
pub use planet::{FlatGenerator, PlanetGenerator, TerrainHeightConfig};
