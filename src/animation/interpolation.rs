use crate::core::point::Point;

/// Interpolation trait for values that can be smoothly transitioned
pub trait Interpolatable {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Interpolatable for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Point {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_lerp() {
        assert_eq!(0.0.lerp(&10.0, 0.5), 5.0);
        assert_eq!(0.0.lerp(&10.0, 0.0), 0.0);
        assert_eq!(0.0.lerp(&10.0, 1.0), 10.0);
    }

    #[test]
    fn test_point_lerp() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, -4.0);
        assert_eq!(start.lerp(&end, 0.5), Point::new(5.0, -2.0));
    }
}
