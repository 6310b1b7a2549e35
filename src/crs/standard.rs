//! Standard CRS definitions and the spherical Mercator projection pair.

use crate::core::point::Point;
use crate::crs::graph::{Crs, CrsGraph, CrsId, Projection};
use std::f64::consts::PI;

/// Spherical earth radius used by Web Mercator (EPSG:3857), in meters
pub const EARTH_RADIUS: f64 = 6378137.0;

/// WGS84 geographic coordinates: x = longitude, y = latitude, in degrees
pub fn wgs84() -> Crs {
    Crs::from_code("EPSG:4326").with_description("WGS 84 geographic")
}

/// Web Mercator projected coordinates, in meters
pub fn web_mercator() -> Crs {
    Crs::from_code("EPSG:3857").with_description("WGS 84 / Pseudo-Mercator")
}

/// Registers WGS84 and Web Mercator with projections in both directions.
///
/// Returns the handles as `(wgs84, web_mercator)`.
pub fn register_standard(graph: &mut CrsGraph) -> (CrsId, CrsId) {
    let geographic = graph.add_crs(wgs84());
    let mercator = graph.add_crs(web_mercator());

    graph.set_projection_to(
        geographic,
        mercator,
        Projection::new(|p| {
            let x = p.x.to_radians() * EARTH_RADIUS;
            let y = (PI / 4.0 + p.y.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
            Point::new(x, y)
        }),
    );
    graph.set_projection_to(
        mercator,
        geographic,
        Projection::new(|p| {
            let lng = (p.x / EARTH_RADIUS).to_degrees();
            let lat = (2.0 * (p.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
            Point::new(lng, lat)
        }),
    );

    (geographic, mercator)
}
