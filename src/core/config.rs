//! Startup configuration for a viewport.

use crate::core::map::{validate_resolution, Map};
use crate::core::point::Point;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serde-backed viewport configuration.
///
/// Values are validated when applied to a [`Map`], not when deserialized;
/// an invalid field rejects the apply and leaves the map untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub position: Point,
    pub resolution: f64,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
    pub animation_duration_ms: u64,
    pub tile_cache_capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            position: Point::default(),
            resolution: 611.496_226_281_250_5,
            min_resolution: None,
            max_resolution: None,
            animation_duration_ms: 300,
            tile_cache_capacity: 256,
        }
    }
}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies the configuration through the map's validating setters.
    ///
    /// All fields are checked before the first setter runs, so a rejected
    /// apply leaves the map exactly as it was.
    pub fn apply(&self, map: &mut Map) -> Result<()> {
        validate_resolution(self.resolution)?;
        map.set_resolution_limits(self.min_resolution, self.max_resolution)?;
        map.set_animation_duration(Duration::from_millis(self.animation_duration_ms));
        map.set_position(self.position, Some(self.resolution))?;
        Ok(())
    }

    /// Tile layer options carrying the configured cache capacity
    pub fn tile_layer_options(&self) -> crate::tiles::layer::TileLayerOptions {
        crate::tiles::layer::TileLayerOptions {
            cache_capacity: self.tile_cache_capacity,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::graph::{Crs, CrsGraph};

    #[test]
    fn test_from_json_with_defaults() {
        let config = MapConfig::from_json(r#"{"resolution": 1222.99}"#).unwrap();
        assert_eq!(config.resolution, 1222.99);
        assert_eq!(config.tile_cache_capacity, 256);
        assert_eq!(config.animation_duration_ms, 300);
    }

    #[test]
    fn test_invalid_json_errors() {
        assert!(MapConfig::from_json("{resolution}").is_err());
    }

    #[test]
    fn test_apply_validates_through_setters() {
        let mut graph = CrsGraph::new();
        let crs = graph.add_crs(Crs::from_code("EPSG:3857"));
        let mut map = Map::new(crs);

        let mut config = MapConfig {
            position: Point::new(100.0, -100.0),
            resolution: 500.0,
            ..MapConfig::default()
        };
        config.apply(&mut map).unwrap();
        assert_eq!(map.position(), Point::new(100.0, -100.0));
        assert_eq!(map.resolution(), 500.0);

        config.resolution = -1.0;
        assert!(config.apply(&mut map).is_err());
        assert_eq!(map.resolution(), 500.0);
    }

    #[test]
    fn test_rejected_apply_leaves_map_untouched() {
        let mut graph = CrsGraph::new();
        let crs = graph.add_crs(Crs::from_code("EPSG:3857"));
        let mut map = Map::new(crs);

        let config = MapConfig {
            resolution: -1.0,
            min_resolution: Some(5.0),
            max_resolution: Some(500.0),
            ..MapConfig::default()
        };
        assert!(config.apply(&mut map).is_err());
        // Valid fields alongside the invalid one must not be applied
        assert_eq!(map.min_resolution(), None);
        assert_eq!(map.max_resolution(), None);
        assert_eq!(map.animation_duration(), Duration::from_millis(300));
    }
}
