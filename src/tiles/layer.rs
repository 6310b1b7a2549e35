//! Tile layers: resolving which tiles cover a viewport bbox.
//!
//! A [`TileLayer`] does not fetch images. It resolves a viewport query into
//! [`TileDescriptor`]s (tile bbox + source URL) and keeps the descriptors in
//! a bounded insertion-ordered cache; downloading and drawing the images is
//! the embedding application's job.

use crate::core::bbox::Bbox;
use crate::crs::graph::{CrsGraph, CrsId};
use crate::tiles::cache::{TileCache, DEFAULT_CAPACITY};
use crate::tiles::scheme::{LevelDefinition, TileScheme};
use log::debug;
use serde::{Deserialize, Serialize};

/// Identity of a tile: level z-index plus raw (unwrapped) indices.
///
/// Indices are kept raw so that wrapped requests that land on the same
/// world-space tile share one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u32,
    pub x: i64,
    pub y: i64,
}

/// Everything a renderer needs to fetch and place one tile
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    pub key: TileKey,
    /// Footprint of the tile in the layer's CRS
    pub bbox: Bbox,
    /// Source URL with `{x}`, `{y}`, `{z}` already substituted
    pub url: String,
}

/// Behavioral knobs of a tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    pub tile_scheme: TileScheme,
    /// Wrap X indices modulo the level's index count
    pub cycle_x: bool,
    /// Wrap Y indices modulo the level's index count
    pub cycle_y: bool,
    /// Tile row 0 at the bottom instead of the top (TMS convention)
    pub reversed_y: bool,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
    pub cache_capacity: usize,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            tile_scheme: TileScheme::web_mercator(),
            cycle_x: false,
            cycle_y: false,
            reversed_y: false,
            min_resolution: None,
            max_resolution: None,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A tiled imagery layer bound to one CRS and one tile scheme
#[derive(Debug)]
pub struct TileLayer {
    url_template: String,
    crs: CrsId,
    options: TileLayerOptions,
    cache: TileCache,
}

impl TileLayer {
    /// Creates a layer with default (Web Mercator) options.
    ///
    /// `url_template` carries literal `{x}`, `{y}` and `{z}` placeholders.
    pub fn new(url_template: impl Into<String>, crs: CrsId) -> Self {
        Self::with_options(url_template, crs, TileLayerOptions::default())
    }

    pub fn with_options(
        url_template: impl Into<String>,
        crs: CrsId,
        options: TileLayerOptions,
    ) -> Self {
        let cache = TileCache::new(options.cache_capacity);
        Self {
            url_template: url_template.into(),
            crs,
            options,
            cache,
        }
    }

    pub fn crs(&self) -> CrsId {
        self.crs
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn tile_scheme(&self) -> &TileScheme {
        &self.options.tile_scheme
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// True when the layer is shown at this resolution
    pub fn check_visibility(&self, resolution: f64) -> bool {
        self.options
            .min_resolution
            .map_or(true, |min| resolution >= min)
            && self
                .options
                .max_resolution
                .map_or(true, |max| resolution <= max)
    }

    /// Resolves the tile descriptors covering `bbox` at `resolution`.
    ///
    /// Returns an empty set when the layer is not visible at this
    /// resolution, the viewport CRS cannot reach the layer CRS, the matched
    /// level is more than twice as coarse as the request, or the clipped
    /// query area is degenerate. The returned ranges over-cover: the union
    /// of the descriptors' bboxes always contains the query bbox.
    pub fn visible_tiles(
        &self,
        graph: &CrsGraph,
        bbox: &Bbox,
        resolution: f64,
    ) -> Vec<TileDescriptor> {
        if !self.check_visibility(resolution) {
            return Vec::new();
        }
        if !graph.can_project_to(bbox.crs(), self.crs) {
            return Vec::new();
        }

        let scheme = &self.options.tile_scheme;
        let Ok(level_index) = scheme.level_index(resolution, false) else {
            return Vec::new();
        };
        let level = scheme.levels()[level_index];
        // Serving a level more than twice as coarse as requested would only
        // produce blur
        if level.resolution > resolution * 2.0 {
            return Vec::new();
        }

        let Ok(projected) = bbox.project_to(graph, self.crs) else {
            return Vec::new();
        };
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (
            projected.x_min(),
            projected.y_min(),
            projected.x_max(),
            projected.y_max(),
        );
        if let Some([lim_x_min, lim_y_min, lim_x_max, lim_y_max]) = scheme.limits {
            x_min = x_min.max(lim_x_min);
            y_min = y_min.max(lim_y_min);
            x_max = x_max.min(lim_x_max);
            y_max = y_max.min(lim_y_max);
        }
        if x_max <= x_min || y_max <= y_min {
            return Vec::new();
        }

        let origin = scheme.origin;
        let span_x = scheme.tile_width as f64 * level.resolution;
        let span_y = scheme.tile_height as f64 * level.resolution;

        let x_start = ((x_min - origin.x) / span_x).floor() as i64;
        let x_end = ((x_max - origin.x) / span_x).ceil() as i64;
        let (y_start, y_end) = if self.options.reversed_y {
            (
                ((y_min - origin.y) / span_y).floor() as i64,
                ((y_max - origin.y) / span_y).ceil() as i64,
            )
        } else {
            (
                ((origin.y - y_max) / span_y).floor() as i64,
                ((origin.y - y_min) / span_y).ceil() as i64,
            )
        };

        debug!(
            "tile query z={} x={}..{} y={}..{}",
            level.z_index, x_start, x_end, y_start, y_end
        );

        let mut descriptors = Vec::with_capacity(((x_end - x_start) * (y_end - y_start)) as usize);
        for x in x_start..x_end {
            for y in y_start..y_end {
                descriptors.push(self.descriptor_for(&level, x, y));
            }
        }
        self.cache.trim();
        descriptors
    }

    /// Fetches or builds the descriptor for a raw tile index pair
    fn descriptor_for(&self, level: &LevelDefinition, x: i64, y: i64) -> TileDescriptor {
        let key = TileKey {
            z: level.z_index,
            x,
            y,
        };
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let url_x = if self.options.cycle_x {
            wrap_index(x, level.index_count)
        } else {
            x
        };
        let url_y = if self.options.cycle_y {
            wrap_index(y, level.index_count)
        } else {
            y
        };

        let descriptor = TileDescriptor {
            key,
            bbox: self.tile_bbox(level, x, y),
            url: self.tile_url(url_x, url_y, level.z_index),
        };
        self.cache.insert(key, descriptor.clone());
        descriptor
    }

    /// Footprint of the tile at raw indices (x, y), honoring the Y-axis
    /// convention: by default row 0 sits at the top and Y decreases with
    /// increasing row index
    fn tile_bbox(&self, level: &LevelDefinition, x: i64, y: i64) -> Bbox {
        let scheme = &self.options.tile_scheme;
        let origin = scheme.origin;
        let span_x = scheme.tile_width as f64 * level.resolution;
        let span_y = scheme.tile_height as f64 * level.resolution;

        let x_min = origin.x + x as f64 * span_x;
        let x_max = x_min + span_x;
        let (y_min, y_max) = if self.options.reversed_y {
            let y_min = origin.y + y as f64 * span_y;
            (y_min, y_min + span_y)
        } else {
            let y_max = origin.y - y as f64 * span_y;
            (y_max - span_y, y_max)
        };
        Bbox::from_coords(x_min, y_min, x_max, y_max, self.crs)
    }

    fn tile_url(&self, x: i64, y: i64, z: u32) -> String {
        self.url_template
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{z}", &z.to_string())
    }
}

/// Wraps a raw index into `[0, count)` when the axis is bounded.
///
/// Negative indices are lifted by repeated addition; a single `%` would be
/// sign-dependent.
fn wrap_index(mut index: i64, count: Option<u32>) -> i64 {
    let Some(count) = count else {
        return index;
    };
    let count = count as i64;
    if count <= 0 {
        return index;
    }
    while index < 0 {
        index += count;
    }
    index % count
}
