//! Axis-aligned bounding boxes tagged with the CRS they live in.

use crate::core::point::Point;
use crate::crs::graph::{CrsGraph, CrsId};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Relative tolerance used by [`Bbox::equals`]
const EQUALITY_TOLERANCE: f64 = 1e-6;

/// An axis-aligned rectangle in the coordinates of a specific CRS.
///
/// The invariant `x_min <= x_max && y_min <= y_max` holds at every observable
/// point: the constructor normalizes its two corners and the border setters
/// reject any value that would invert a pair, leaving the box unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
    crs: CrsId,
}

impl Bbox {
    /// Creates a bbox from two opposite corners, in any order
    pub fn new(p1: Point, p2: Point, crs: CrsId) -> Self {
        Self {
            x_min: p1.x.min(p2.x),
            y_min: p1.y.min(p2.y),
            x_max: p1.x.max(p2.x),
            y_max: p1.y.max(p2.y),
            crs,
        }
    }

    /// Creates a bbox from individual border coordinates
    pub fn from_coords(x_min: f64, y_min: f64, x_max: f64, y_max: f64, crs: CrsId) -> Self {
        Self::new(Point::new(x_min, y_min), Point::new(x_max, y_max), crs)
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// The CRS this bbox is expressed in
    pub fn crs(&self) -> CrsId {
        self.crs
    }

    /// Sets the left border; fails if it would pass the right border
    pub fn set_x_min(&mut self, value: f64) -> Result<()> {
        if value > self.x_max {
            return Err(MapError::InvalidBboxBounds(format!(
                "x_min {} would exceed x_max {}",
                value, self.x_max
            )));
        }
        self.x_min = value;
        Ok(())
    }

    /// Sets the bottom border; fails if it would pass the top border
    pub fn set_y_min(&mut self, value: f64) -> Result<()> {
        if value > self.y_max {
            return Err(MapError::InvalidBboxBounds(format!(
                "y_min {} would exceed y_max {}",
                value, self.y_max
            )));
        }
        self.y_min = value;
        Ok(())
    }

    /// Sets the right border; fails if it would pass the left border
    pub fn set_x_max(&mut self, value: f64) -> Result<()> {
        if value < self.x_min {
            return Err(MapError::InvalidBboxBounds(format!(
                "x_max {} would fall below x_min {}",
                value, self.x_min
            )));
        }
        self.x_max = value;
        Ok(())
    }

    /// Sets the top border; fails if it would pass the bottom border
    pub fn set_y_max(&mut self, value: f64) -> Result<()> {
        if value < self.y_min {
            return Err(MapError::InvalidBboxBounds(format!(
                "y_max {} would fall below y_min {}",
                value, self.y_min
            )));
        }
        self.y_max = value;
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Returns a new bbox re-expressed in `target` coordinates.
    ///
    /// Both corners are projected and the borders re-derived from the
    /// projected pair, since a projection may flip an axis. Fails with
    /// [`MapError::UnprojectableCrs`] when the graph has no path.
    pub fn project_to(&self, graph: &CrsGraph, target: CrsId) -> Result<Bbox> {
        let projection =
            graph
                .projection_to(self.crs, target)
                .ok_or_else(|| MapError::UnprojectableCrs {
                    from: graph.describe(self.crs),
                    to: graph.describe(target),
                })?;

        let p1 = projection.apply(Point::new(self.x_min, self.y_min));
        let p2 = projection.apply(Point::new(self.x_max, self.y_max));
        Ok(Bbox::new(p1, p2, target))
    }

    /// Strict open-interval overlap test.
    ///
    /// `other` is first projected into this bbox's CRS; an unprojectable
    /// pair reports `false` rather than erroring. Boxes that merely touch
    /// along a border do not intersect.
    pub fn intersects(&self, graph: &CrsGraph, other: &Bbox) -> bool {
        let Ok(other) = other.project_to(graph, self.crs) else {
            return false;
        };
        self.x_max > other.x_min
            && self.x_min < other.x_max
            && self.y_max > other.y_min
            && self.y_min < other.y_max
    }

    /// Returns the bbox enclosing both `self` and `other`.
    ///
    /// Despite the name this is the union-bounding box, not the overlap
    /// region; the boolean overlap test is [`Bbox::intersects`]. The naming
    /// is kept for compatibility with the engines this library descends
    /// from.
    pub fn intersect(&self, graph: &CrsGraph, other: &Bbox) -> Result<Bbox> {
        let other = other.project_to(graph, self.crs)?;
        Ok(Bbox::from_coords(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
            self.crs,
        ))
    }

    /// Inclusive containment test for a point given in `point_crs`
    pub fn contains(&self, graph: &CrsGraph, point: Point, point_crs: CrsId) -> bool {
        let Some(projection) = graph.projection_to(point_crs, self.crs) else {
            return false;
        };
        let p = projection.apply(point);
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Tolerance-based equality: all four borders within a relative 1e-6
    /// and the same CRS (by graph equality). Coordinates are compared as
    /// numbers; no re-projection is attempted.
    pub fn equals(&self, graph: &CrsGraph, other: &Bbox) -> bool {
        graph.equals(self.crs, other.crs)
            && soft_equals(self.x_min, other.x_min)
            && soft_equals(self.y_min, other.y_min)
            && soft_equals(self.x_max, other.x_max)
            && soft_equals(self.y_max, other.y_max)
    }
}

fn soft_equals(a: f64, b: f64) -> bool {
    (a - b).abs() < EQUALITY_TOLERANCE * a.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::graph::{Crs, Projection};

    fn graph_with_one_crs() -> (CrsGraph, CrsId) {
        let mut graph = CrsGraph::new();
        let crs = graph.add_crs(Crs::from_code("TEST"));
        (graph, crs)
    }

    #[test]
    fn test_corners_are_normalized() {
        let (_, crs) = graph_with_one_crs();
        let bbox = Bbox::new(Point::new(10.0, -5.0), Point::new(-10.0, 5.0), crs);

        assert_eq!(bbox.x_min(), -10.0);
        assert_eq!(bbox.y_min(), -5.0);
        assert_eq!(bbox.x_max(), 10.0);
        assert_eq!(bbox.y_max(), 5.0);
    }

    #[test]
    fn test_border_setters_reject_inversion() {
        let (_, crs) = graph_with_one_crs();
        let mut bbox = Bbox::from_coords(0.0, 0.0, 10.0, 10.0, crs);

        assert!(bbox.set_x_min(20.0).is_err());
        assert!(bbox.set_y_max(-1.0).is_err());
        // The failed mutations left the box untouched
        assert_eq!(bbox.x_min(), 0.0);
        assert_eq!(bbox.y_max(), 10.0);

        assert!(bbox.set_x_min(5.0).is_ok());
        assert_eq!(bbox.x_min(), 5.0);
    }

    #[test]
    fn test_touching_borders_do_not_intersect() {
        let (graph, crs) = graph_with_one_crs();
        let left = Bbox::from_coords(0.0, 0.0, 10.0, 10.0, crs);
        let right = Bbox::from_coords(10.0, 0.0, 20.0, 10.0, crs);
        let overlapping = Bbox::from_coords(9.0, 0.0, 20.0, 10.0, crs);

        assert!(!left.intersects(&graph, &right));
        assert!(left.intersects(&graph, &overlapping));
    }

    #[test]
    fn test_contains_is_border_inclusive() {
        let (graph, crs) = graph_with_one_crs();
        let bbox = Bbox::from_coords(0.0, 0.0, 10.0, 10.0, crs);

        assert!(bbox.contains(&graph, Point::new(10.0, 0.0), crs));
        assert!(bbox.contains(&graph, Point::new(5.0, 5.0), crs));
        assert!(!bbox.contains(&graph, Point::new(10.1, 0.0), crs));
    }

    #[test]
    fn test_equality_tolerance() {
        let (graph, crs) = graph_with_one_crs();
        let base = Bbox::from_coords(0.0, 0.0, 10.0, 10.0, crs);
        let close = Bbox::from_coords(0.0, 0.0, 10.000_000_1, 10.0, crs);
        let far = Bbox::from_coords(0.0, 0.0, 10.01, 10.0, crs);

        assert!(base.equals(&graph, &close));
        assert!(!base.equals(&graph, &far));
    }

    #[test]
    fn test_equality_requires_same_crs() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));

        let in_a = Bbox::from_coords(0.0, 0.0, 1.0, 1.0, a);
        let in_b = Bbox::from_coords(0.0, 0.0, 1.0, 1.0, b);
        assert!(!in_a.equals(&graph, &in_b));
    }

    #[test]
    fn test_intersect_returns_enclosing_box() {
        let (graph, crs) = graph_with_one_crs();
        let a = Bbox::from_coords(0.0, 0.0, 10.0, 10.0, crs);
        let b = Bbox::from_coords(5.0, -5.0, 20.0, 5.0, crs);

        let enclosing = a.intersect(&graph, &b).unwrap();
        assert_eq!(enclosing.x_min(), 0.0);
        assert_eq!(enclosing.y_min(), -5.0);
        assert_eq!(enclosing.x_max(), 20.0);
        assert_eq!(enclosing.y_max(), 10.0);
    }

    #[test]
    fn test_project_to_rederives_borders() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));
        // Axis-flipping projection: min/max must be recomputed
        graph.set_projection_to(a, b, Projection::new(|p| Point::new(-p.x, -p.y)));

        let bbox = Bbox::from_coords(1.0, 2.0, 3.0, 4.0, a);
        let projected = bbox.project_to(&graph, b).unwrap();

        assert_eq!(projected.x_min(), -3.0);
        assert_eq!(projected.y_min(), -4.0);
        assert_eq!(projected.x_max(), -1.0);
        assert_eq!(projected.y_max(), -2.0);
        assert_eq!(projected.crs(), b);
    }

    #[test]
    fn test_project_to_unreachable_errors() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));

        let bbox = Bbox::from_coords(0.0, 0.0, 1.0, 1.0, a);
        assert!(matches!(
            bbox.project_to(&graph, b),
            Err(MapError::UnprojectableCrs { .. })
        ));
    }
}
