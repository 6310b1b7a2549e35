pub mod graph;
pub mod standard;
