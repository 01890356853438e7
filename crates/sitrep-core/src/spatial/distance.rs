//! Geodesic Distance Primitives
//!
//! Thin lat/lon-ordered wrappers over the great-circle distance used by
//! every geospatial scan and score in the crate.

use geo::{HaversineDistance, Point};

/// Great-circle distance between two WGS84 points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2)) / 1000.0
}

/// Great-circle distance in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}
