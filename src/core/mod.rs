pub mod bbox;
pub mod config;
pub mod map;
pub mod point;
