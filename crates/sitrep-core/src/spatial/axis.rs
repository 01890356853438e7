//! Direction Axis Projection
//!
//! A direction axis is the segment from a named anchor city to its
//! stable nearest point on the line of contact. Candidates project onto
//! the axis to yield `along_km` (0 at the city, positive toward the
//! front) and `cross_km` (perpendicular distance). Projection runs in a
//! local tangent plane about the axis origin; accurate at the sub-few-
//! hundred-km scales directions operate over.

use crate::spatial::frontline::Frontline;

// Mean Earth radius per IUGG 1980, km
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// An anchor-city → frontline axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionAxis {
    /// Anchor city (axis origin)
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Frontline anchor (axis head)
    pub head_lat: f64,
    pub head_lon: f64,
    /// Axis length in kilometers
    pub length_km: f64,
}

/// A candidate's position relative to an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisProjection {
    /// Signed distance along the axis; 0 at the city, positive toward
    /// the front
    pub along_km: f64,
    /// Perpendicular distance from the axis
    pub cross_km: f64,
}

impl DirectionAxis {
    /// Build the axis for an anchor city. `None` when the frontline is
    /// empty.
    pub fn build(frontline: &Frontline, city_lat: f64, city_lon: f64) -> Option<Self> {
        let (head_lat, head_lon) = frontline.anchor_for_city(city_lat, city_lon)?;
        let axis = Self {
            origin_lat: city_lat,
            origin_lon: city_lon,
            head_lat,
            head_lon,
            length_km: crate::spatial::haversine_km(city_lat, city_lon, head_lat, head_lon),
        };
        Some(axis)
    }

    fn local_plane(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_KM
            * (lon - self.origin_lon).to_radians()
            * self.origin_lat.to_radians().cos();
        let y = EARTH_RADIUS_KM * (lat - self.origin_lat).to_radians();
        (x, y)
    }

    /// Project a WGS84 point onto the axis.
    pub fn project(&self, lat: f64, lon: f64) -> AxisProjection {
        let (ax, ay) = self.local_plane(self.head_lat, self.head_lon);
        let (px, py) = self.local_plane(lat, lon);

        let axis_len = (ax * ax + ay * ay).sqrt();
        if axis_len < 1e-9 {
            // City sits on the frontline: no direction, only radial distance
            return AxisProjection {
                along_km: 0.0,
                cross_km: (px * px + py * py).sqrt(),
            };
        }

        let along = (px * ax + py * ay) / axis_len;
        let cross = (px * ay - py * ax).abs() / axis_len;

        AxisProjection {
            along_km: along,
            cross_km: cross,
        }
    }
}
