//! # Carta
//!
//! A Rust-native map viewer core inspired by Leaflet-style engines.
//!
//! Carta owns the hard, non-visual parts of an interactive map: a
//! coordinate-reference-system projection graph with lazy path discovery,
//! CRS-tagged bounding-box algebra, tile-scheme resolution ladders with
//! bounded descriptor caching, and an animated viewport state machine.
//! Rendering, input handling and tile image fetching are left to the
//! embedding application, which consumes the bboxes, resolutions and tile
//! descriptors produced here.

pub mod animation;
pub mod core;
pub mod crs;
pub mod tiles;

// Re-export public API
pub use crate::core::{bbox::Bbox, config::MapConfig, map::Map, point::Point};

pub use crate::crs::{
    graph::{Crs, CrsGraph, CrsId, Projection},
    standard,
};

pub use crate::tiles::{
    cache::TileCache,
    layer::{TileDescriptor, TileKey, TileLayer, TileLayerOptions},
    scheme::{LevelDefinition, TileScheme},
};

pub use crate::animation::easing::EasingFunction;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("no projection path from {from} to {to}")]
    UnprojectableCrs { from: String, to: String },

    #[error("invalid bbox bounds: {0}")]
    InvalidBboxBounds(String),

    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("tile scheme has no levels configured")]
    EmptyTileScheme,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;
