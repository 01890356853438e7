//! Geographic-JSON Parsing
//!
//! Minimal typed view over the GeoJSON subset the core consumes: the
//! frontline polyline set and operational-group AO polygons. Positions
//! are `[lon, lat, ...]`; trailing elements (altitude) are ignored.

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;

/// A GeoJSON position: `[lon, lat]` with optional extra elements.
pub type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// The feature's `name` property, if present and a string.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

fn coord(pos: &Position) -> Option<Coord<f64>> {
    match pos.as_slice() {
        [lon, lat, ..] => Some(Coord { x: *lon, y: *lat }),
        _ => None,
    }
}

fn line(positions: &[Position]) -> Option<Vec<Coord<f64>>> {
    let coords: Vec<Coord<f64>> = positions.iter().filter_map(coord).collect();
    (coords.len() >= 2).then_some(coords)
}

impl Geometry {
    /// Flatten into WGS84 polylines. Polygons contribute their outer
    /// rings; this is the frontline interpretation of area features.
    pub fn polylines(&self) -> Vec<Vec<Coord<f64>>> {
        match self {
            Geometry::LineString { coordinates } => line(coordinates).into_iter().collect(),
            Geometry::MultiLineString { coordinates } => {
                coordinates.iter().filter_map(|l| line(l)).collect()
            }
            Geometry::Polygon { coordinates } => coordinates
                .first()
                .and_then(|outer| line(outer))
                .into_iter()
                .collect(),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|poly| poly.first().and_then(|outer| line(outer)))
                .collect(),
            Geometry::Unsupported => Vec::new(),
        }
    }

    /// Interpret the geometry as one WGS84 polygon (AO interpretation).
    ///
    /// A MultiPolygon contributes its first member; interior rings are
    /// preserved as holes.
    pub fn polygon(&self) -> Option<Polygon<f64>> {
        let rings: &Vec<Vec<Position>> = match self {
            Geometry::Polygon { coordinates } => coordinates,
            Geometry::MultiPolygon { coordinates } => coordinates.first()?,
            _ => return None,
        };

        let exterior = LineString::from(line(rings.first()?)?);
        let interiors: Vec<LineString<f64>> = rings[1..]
            .iter()
            .filter_map(|ring| line(ring).map(LineString::from))
            .collect();

        Some(Polygon::new(exterior, interiors))
    }
}
