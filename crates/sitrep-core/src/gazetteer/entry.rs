//! Gazetteer Entry Records
//!
//! Plain value records for the four gazetteer domains. Each entity has a
//! canonical name and a set of aliases; aliases are unique per domain
//! after normalization (REGION and DIRECTION strictly so, LOCATION
//! tolerates duplicates and returns lists).

use geo::Polygon;
use serde::{Deserialize, Serialize};

/// Canonical representation of a mappable place.
///
/// Derived from the locale lookup table (base) or patch CSVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleEntry {
    /// Primary display name
    pub name: String,
    /// Alternate names, spellings, exonyms
    pub aliases: Vec<String>,

    /// Normalized WGS84 longitude
    pub lon: f64,
    /// Normalized WGS84 latitude
    pub lat: f64,
    /// 64-bit packed coordinate identity (see [`crate::gazetteer::encode_coord`])
    pub cid: u64,

    /// Administrative region (oblast), if known
    pub region: Option<String>,
    /// Operational group the locale falls under, if known
    pub ru_group: Option<String>,
    /// Settlement type ("city", "village", ...)
    pub place: Option<String>,
    /// External identifier
    pub wikidata: Option<String>,
    /// Usage counter maintained by review tooling
    pub usage: u32,
    /// "base" | "patch" | "manual"
    pub source: String,
}

/// A named administrative region with its declared neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub name: String,
    pub aliases: Vec<String>,
    /// Names of adjacent regions (soft-match set for scoring)
    pub neighbors: Vec<String>,
    pub wikidata: Option<String>,
}

/// An operational group: member regions, neighboring groups, and an
/// area-of-operations polygon in WGS84.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub aliases: Vec<String>,
    /// Regions the group operates in
    pub regions: Vec<String>,
    /// Names of neighboring groups
    pub neighbors: Vec<String>,
    /// AO polygon; attached from the geometry file after CSV load
    #[serde(skip)]
    pub polygon: Option<Polygon<f64>>,
}

/// A named directional axis anchored on one or more locales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionEntry {
    pub name: String,
    pub aliases: Vec<String>,
    /// Anchor locales referenced by packed coordinate identity
    pub anchors: Vec<u64>,
}
