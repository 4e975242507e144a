//! Shared configuration for the brush kernel
//!
//! This crate is the single source of truth for the floating point
//! tolerances used by the polyhedron and brush crates, and for the
//! settings an editor passes to them (world extent, grid, default texture).

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Tolerance for position equality. Positions are never compared exactly.
pub const ALMOST_ZERO: f64 = 0.001;

/// Distance below which a point counts as lying on a plane.
pub const POINT_STATUS_EPSILON: f64 = 0.0001;

/// Distance below which three points count as collinear.
pub const COLINEAR_EPSILON: f64 = 0.00001;

/// Coordinates within this distance of an integer are snapped to it after clipping.
pub const CORRECT_EPSILON: f64 = 0.001;

/// Edges shorter than this are collapsed when healing a polyhedron.
pub const MIN_EDGE_LENGTH: f64 = 0.01;

/// The initial clipping volume is the world bounds grown by this amount.
pub const WORLD_BOUNDS_PADDING: f64 = 1.0;

/// Default half size of the world cube
pub const DEFAULT_WORLD_EXTENT: f64 = 16384.0;

/// Default grid size used for snapping
pub const DEFAULT_GRID_SIZE: f64 = 16.0;

/// Texture assigned to faces that have no other source
pub const DEFAULT_TEXTURE: &str = "__empty";

/// Settings shared by the brush editing operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Half size of the cube that bounds the world
    pub world_extent: f64,
    /// Grid size for vertex snapping
    pub grid_size: f64,
    /// Texture name for newly created faces
    pub default_texture: String,
    /// Whether edits keep textures fixed in world space by default
    pub lock_textures: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            world_extent: DEFAULT_WORLD_EXTENT,
            grid_size: DEFAULT_GRID_SIZE,
            default_texture: DEFAULT_TEXTURE.to_string(),
            lock_textures: false,
        }
    }
}

impl KernelConfig {
    /// Create a config with the given world extent and defaults elsewhere
    pub fn new(world_extent: f64) -> Self {
        Self {
            world_extent,
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Minimum and maximum corner of the world cube
    pub fn world_bounds(&self) -> (DVec3, DVec3) {
        let extent = self.world_extent.abs();
        (DVec3::splat(-extent), DVec3::splat(extent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert_eq!(config.world_extent, DEFAULT_WORLD_EXTENT);
        assert_eq!(config.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(config.default_texture, DEFAULT_TEXTURE);
        assert!(!config.lock_textures);
    }

    #[test]
    fn test_world_bounds() {
        let config = KernelConfig::new(512.0);
        let (min, max) = config.world_bounds();
        assert_eq!(min, DVec3::splat(-512.0));
        assert_eq!(max, DVec3::splat(512.0));
    }

    #[test]
    fn test_from_json_partial() {
        let config = KernelConfig::from_json(r#"{ "grid_size": 8.0, "lock_textures": true }"#).unwrap();
        assert_eq!(config.grid_size, 8.0);
        assert!(config.lock_textures);
        assert_eq!(config.world_extent, DEFAULT_WORLD_EXTENT);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(KernelConfig::from_json("not json").is_err());
    }
}
