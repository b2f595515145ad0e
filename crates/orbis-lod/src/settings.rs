//! Runtime knobs for a patch forest.

use crate::LodError;

/// Settings the forest is built with.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    /// Number of patch-sized regions in the shared vertex buffer.
    pub arena_capacity: usize,
    /// Vertices along each patch edge. Odd values let a build measure its
    /// error against the next coarser level.
    pub patch_resolution: u32,
    /// Deepest subdivision level a patch may reach (roots are depth 0).
    pub max_depth: u8,
    /// Error threshold of a root patch; halves at every level.
    pub root_error_threshold: f64,
    /// Multiplier from a patch's widest edge to its split distance.
    pub split_distance_factor: f64,
    /// Fresh splits are deferred while this many builds are outstanding.
    pub max_pending_builds: usize,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            arena_capacity: 1024,
            patch_resolution: 17,
            max_depth: 14,
            root_error_threshold: 1.0,
            split_distance_factor: 1.5,
            max_pending_builds: 64,
        }
    }
}

impl LodSettings {
    /// Vertex count of one patch, and so of one arena slot.
    #[must_use]
    pub fn vertices_per_patch(&self) -> usize {
        let res = self.patch_resolution as usize;
        res * res
    }

    /// Reject settings that cannot produce a working forest.
    pub fn validate(&self) -> Result<(), LodError> {
        if self.arena_capacity == 0 {
            return Err(LodError::InvalidSettings(
                "arena_capacity must be at least 1".into(),
            ));
        }
        if self.patch_resolution < 2 {
            return Err(LodError::InvalidSettings(format!(
                "patch_resolution must be at least 2, got {}",
                self.patch_resolution
            )));
        }
        if self
            .vertices_per_patch()
            .checked_mul(self.arena_capacity)
            .is_none_or(|total| total > u32::MAX as usize)
        {
            return Err(LodError::InvalidSettings(format!(
                "{} slots of {} vertices overflow a 32-bit vertex index",
                self.arena_capacity,
                self.vertices_per_patch()
            )));
        }
        if self.root_error_threshold.is_nan() || self.root_error_threshold <= 0.0 {
            return Err(LodError::InvalidSettings(format!(
                "root_error_threshold must be positive, got {}",
                self.root_error_threshold
            )));
        }
        if self.split_distance_factor.is_nan() || self.split_distance_factor <= 0.0 {
            return Err(LodError::InvalidSettings(format!(
                "split_distance_factor must be positive, got {}",
                self.split_distance_factor
            )));
        }
        Ok(())
    }
}
