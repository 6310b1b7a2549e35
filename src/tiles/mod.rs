pub mod cache;
pub mod layer;
pub mod scheme;

pub use cache::TileCache;
pub use layer::{TileDescriptor, TileKey, TileLayer, TileLayerOptions};
pub use scheme::{LevelDefinition, TileScheme};
