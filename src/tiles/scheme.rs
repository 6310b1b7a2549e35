//! Tile schemes: the ladder of discrete resolution levels and the tiling
//! geometry (origin, tile pixel size) that partitions a CRS into tiles.

use crate::core::point::Point;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Absolute tolerance when matching a resolution against the level ladder
const RESOLUTION_TOLERANCE: f64 = 1e-3;

/// One resolution level of a tile scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Map units per tile pixel at this level
    pub resolution: f64,
    /// The `{z}` value used in tile URLs
    pub z_index: u32,
    /// Number of tile indices along a cycled axis, if bounded
    pub index_count: Option<u32>,
}

/// An ordered ladder of resolution levels plus the tiling origin.
///
/// Levels are kept sorted ascending by resolution (finest first); the order
/// is re-established whenever the levels are replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileScheme {
    levels: Vec<LevelDefinition>,
    /// Corner of tile (0, 0) at every level
    pub origin: Point,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Optional rectangular coordinate limits `[x_min, y_min, x_max, y_max]`
    /// that queries are clipped to
    pub limits: Option<[f64; 4]>,
}

impl TileScheme {
    pub fn new(
        levels: Vec<LevelDefinition>,
        origin: Point,
        tile_width: u32,
        tile_height: u32,
    ) -> Self {
        let mut scheme = Self {
            levels: Vec::new(),
            origin,
            tile_width,
            tile_height,
            limits: None,
        };
        scheme.set_levels(levels);
        scheme
    }

    /// The standard Web Mercator scheme: 18 levels, 256x256 tiles, top
    /// resolution 156543.03392800014 halving per level, origin at the
    /// top-left corner of the projected world square.
    pub fn web_mercator() -> Self {
        let levels = (0..18)
            .map(|z| LevelDefinition {
                resolution: 156543.033_928_000_14 / (1u64 << z) as f64,
                z_index: z,
                index_count: Some(1 << z),
            })
            .collect();
        Self::new(
            levels,
            Point::new(-20037508.342787, 20037508.342787),
            256,
            256,
        )
    }

    /// Levels in ascending resolution order
    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    /// Replaces the level ladder, re-sorting ascending by resolution
    pub fn set_levels(&mut self, mut levels: Vec<LevelDefinition>) {
        levels.sort_by(|a, b| {
            a.resolution
                .partial_cmp(&b.resolution)
                .unwrap_or(Ordering::Equal)
        });
        self.levels = levels;
    }

    /// Index of the first level whose resolution covers `resolution`.
    ///
    /// Scans the ascending ladder and returns the first level whose
    /// resolution is at least `resolution - tolerance`; when `finer` is set
    /// the result steps back one level unless already at the finest. Falls
    /// back to the coarsest level when nothing covers the request. An empty
    /// ladder is a configuration error surfaced here, not at construction.
    pub fn level_index(&self, resolution: f64, finer: bool) -> Result<usize> {
        if self.levels.is_empty() {
            return Err(MapError::EmptyTileScheme);
        }
        for (index, level) in self.levels.iter().enumerate() {
            if level.resolution >= resolution - RESOLUTION_TOLERANCE {
                return Ok(if finer && index > 0 { index - 1 } else { index });
            }
        }
        Ok(self.levels.len() - 1)
    }

    /// Snaps a resolution onto the level ladder
    pub fn adjusted_resolution(&self, resolution: f64, finer: bool) -> Result<f64> {
        Ok(self.levels[self.level_index(resolution, finer)?].resolution)
    }

    /// Resolution of the finest level
    pub fn min_resolution(&self) -> Result<f64> {
        self.levels
            .first()
            .map(|level| level.resolution)
            .ok_or(MapError::EmptyTileScheme)
    }

    /// Resolution of the coarsest level
    pub fn max_resolution(&self) -> Result<f64> {
        self.levels
            .last()
            .map(|level| level.resolution)
            .ok_or(MapError::EmptyTileScheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_levels() -> TileScheme {
        // Deliberately unsorted input
        TileScheme::new(
            vec![
                LevelDefinition {
                    resolution: 40.0,
                    z_index: 0,
                    index_count: None,
                },
                LevelDefinition {
                    resolution: 10.0,
                    z_index: 2,
                    index_count: None,
                },
                LevelDefinition {
                    resolution: 20.0,
                    z_index: 1,
                    index_count: None,
                },
            ],
            Point::new(0.0, 0.0),
            256,
            256,
        )
    }

    #[test]
    fn test_levels_are_sorted_ascending() {
        let scheme = three_levels();
        let resolutions: Vec<f64> = scheme.levels().iter().map(|l| l.resolution).collect();
        assert_eq!(resolutions, vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_level_index_scan() {
        let scheme = three_levels();

        assert_eq!(scheme.level_index(10.0, false).unwrap(), 0);
        assert_eq!(scheme.level_index(15.0, false).unwrap(), 1);
        // Within tolerance of an exact level
        assert_eq!(scheme.level_index(20.0005, false).unwrap(), 1);
        // Coarsest fallback for anything beyond the ladder
        assert_eq!(scheme.level_index(100.0, false).unwrap(), 2);
    }

    #[test]
    fn test_finer_steps_back_one_level() {
        let scheme = three_levels();
        assert_eq!(scheme.level_index(15.0, true).unwrap(), 0);
        // Already at the finest level
        assert_eq!(scheme.level_index(5.0, true).unwrap(), 0);
    }

    #[test]
    fn test_snapping_is_idempotent() {
        let scheme = TileScheme::web_mercator();
        for &resolution in &[0.5, 3.7, 611.5, 100_000.0, 500_000.0] {
            let snapped = scheme.adjusted_resolution(resolution, false).unwrap();
            let twice = scheme.adjusted_resolution(snapped, false).unwrap();
            assert_eq!(snapped, twice);
        }
    }

    #[test]
    fn test_empty_scheme_errors_at_lookup() {
        let scheme = TileScheme::new(Vec::new(), Point::new(0.0, 0.0), 256, 256);
        assert!(matches!(
            scheme.level_index(10.0, false),
            Err(MapError::EmptyTileScheme)
        ));
        assert!(scheme.min_resolution().is_err());
        assert!(scheme.max_resolution().is_err());
    }

    #[test]
    fn test_web_mercator_defaults() {
        let scheme = TileScheme::web_mercator();
        assert_eq!(scheme.levels().len(), 18);
        assert_eq!(scheme.max_resolution().unwrap(), 156543.033_928_000_14);
        // Level 1 is half the top resolution
        assert_eq!(
            scheme.level_index(78271.516_964_000_07, false).unwrap(),
            16
        );
        assert_eq!(scheme.levels()[16].z_index, 1);
    }
}
