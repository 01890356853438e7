//! Line-of-Contact Geometry
//!
//! The frontline is a WGS84 polyline set held in a metric (web-mercator)
//! projection for nearest-point queries. Distances reported to callers
//! are geodesic: the nearest point is found in metric space, transformed
//! back to WGS84, and measured with the Haversine formula.

use geo::{ClosestPoint, Coord, LineString, MultiLineString, Point};

use crate::spatial::distance::haversine_km;
use crate::spatial::geojson::FeatureCollection;
use crate::spatial::SpatialError;

// Web-mercator (EPSG:3857) sphere radius, meters
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

pub(crate) fn to_metric(lon: f64, lat: f64) -> Coord<f64> {
    let x = MERCATOR_RADIUS_M * lon.to_radians();
    let y = MERCATOR_RADIUS_M
        * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
            .tan()
            .ln();
    Coord { x, y }
}

pub(crate) fn to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / MERCATOR_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Frontline distance helper.
///
/// Read-only after load; multiple workers may share one instance.
pub struct Frontline {
    metric: MultiLineString<f64>,
}

impl Frontline {
    /// Build from WGS84 polylines (each a sequence of `(lon, lat)` coords).
    pub fn from_polylines(polylines_wgs84: Vec<Vec<Coord<f64>>>) -> Self {
        let metric_lines: Vec<LineString<f64>> = polylines_wgs84
            .into_iter()
            .filter(|line| line.len() >= 2)
            .map(|line| {
                LineString::from(
                    line.into_iter()
                        .map(|c| to_metric(c.x, c.y))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        Self {
            metric: MultiLineString::new(metric_lines),
        }
    }

    /// Load from a geographic-JSON feature collection. LineString,
    /// MultiLineString, and polygon outer rings all contribute.
    pub fn from_geojson_str(src: &str) -> Result<Self, SpatialError> {
        let fc: FeatureCollection = serde_json::from_str(src)?;
        let mut polylines = Vec::new();
        for feature in &fc.features {
            if let Some(geom) = &feature.geometry {
                polylines.extend(geom.polylines());
            }
        }
        Ok(Self::from_polylines(polylines))
    }

    pub fn is_empty(&self) -> bool {
        self.metric.0.is_empty()
    }

    /// The point on the line of contact nearest to `(lat, lon)`, in WGS84.
    pub fn nearest_point(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }

        let pt = Point::from(to_metric(lon, lat));
        let closest = match self.metric.closest_point(&pt) {
            geo::Closest::Intersection(p) | geo::Closest::SinglePoint(p) => p,
            geo::Closest::Indeterminate => return None,
        };

        let (lon_a, lat_a) = to_wgs84(closest.x(), closest.y());
        Some((lat_a, lon_a))
    }

    /// Geodesic distance from `(lat, lon)` to the line of contact, km.
    pub fn shortest_distance_km(&self, lat: f64, lon: f64) -> Option<f64> {
        self.nearest_point(lat, lon)
            .map(|(lat_a, lon_a)| haversine_km(lat, lon, lat_a, lon_a))
    }

    /// The stable frontline anchor for a direction city: the nearest
    /// point on the line of contact to the city. Always use this anchor
    /// for that city when reasoning about "city direction".
    pub fn anchor_for_city(&self, city_lat: f64, city_lon: f64) -> Option<(f64, f64)> {
        self.nearest_point(city_lat, city_lon)
    }
}
