pub mod easing;
pub mod interpolation;

pub use easing::EasingFunction;
pub use interpolation::Interpolatable;
