//! Gazetteer Source Loading
//!
//! Four aligned CSV lookup tables keyed by normalized alias: LOCATION,
//! REGION, GROUP, DIRECTION. Alias columns are semicolon-packed and must
//! survive the normalization round-trip. Locale patch files go through
//! the same codec in both directions. Group AO polygons attach from a
//! geographic-JSON file after the CSV pass.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gazetteer::alias::{normalize_location_key, pack_aliases, unpack_aliases};
use crate::gazetteer::coord::encode_coord;
use crate::gazetteer::entry::{DirectionEntry, GroupEntry, LocaleEntry, RegionEntry};
use crate::gazetteer::index::{GazetteerError, GazetteerIndex, Result};
use crate::spatial::geojson::FeatureCollection;

// ============================================================================
// RAW CSV ROWS
// ============================================================================

#[derive(Debug, Deserialize)]
struct LocaleRow {
    name: String,
    #[serde(default)]
    aliases: Option<String>,
    lon: f64,
    lat: f64,
    #[serde(default)]
    cid: Option<u64>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    ru_group: Option<String>,
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    wikidata: Option<String>,
    #[serde(default)]
    usage: Option<u32>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    name: String,
    #[serde(default)]
    aliases: Option<String>,
    #[serde(default)]
    neighbors: Option<String>,
    #[serde(default)]
    wikidata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    name: String,
    #[serde(default)]
    aliases: Option<String>,
    #[serde(default)]
    regions: Option<String>,
    #[serde(default)]
    neighbors: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionRow {
    name: String,
    #[serde(default)]
    aliases: Option<String>,
    #[serde(default)]
    anchors: Option<String>,
}

#[derive(Debug, Serialize)]
struct LocalePatchRow<'a> {
    name: &'a str,
    aliases: String,
    lon: f64,
    lat: f64,
    cid: u64,
    region: Option<&'a str>,
    ru_group: Option<&'a str>,
    place: Option<&'a str>,
    wikidata: Option<&'a str>,
    usage: u32,
    source: &'a str,
}

fn unpack_opt(col: Option<&str>) -> Vec<String> {
    col.map(unpack_aliases).unwrap_or_default()
}

// ============================================================================
// READERS
// ============================================================================

/// Read locale rows from CSV. Missing `cid` columns are derived from the
/// coordinates.
pub fn read_locales(rdr: impl Read) -> Result<Vec<LocaleEntry>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: LocaleRow = row?;
        let cid = row.cid.unwrap_or_else(|| encode_coord(row.lat, row.lon));
        out.push(LocaleEntry {
            aliases: unpack_opt(row.aliases.as_deref()),
            name: row.name,
            lon: row.lon,
            lat: row.lat,
            cid,
            region: row.region,
            ru_group: row.ru_group,
            place: row.place,
            wikidata: row.wikidata,
            usage: row.usage.unwrap_or(0),
            source: row.source.unwrap_or_else(|| "base".to_string()),
        });
    }
    Ok(out)
}

pub fn read_regions(rdr: impl Read) -> Result<Vec<RegionEntry>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: RegionRow = row?;
        out.push(RegionEntry {
            aliases: unpack_opt(row.aliases.as_deref()),
            neighbors: unpack_opt(row.neighbors.as_deref()),
            name: row.name,
            wikidata: row.wikidata,
        });
    }
    Ok(out)
}

pub fn read_groups(rdr: impl Read) -> Result<Vec<GroupEntry>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: GroupRow = row?;
        out.push(GroupEntry {
            aliases: unpack_opt(row.aliases.as_deref()),
            regions: unpack_opt(row.regions.as_deref()),
            neighbors: unpack_opt(row.neighbors.as_deref()),
            name: row.name,
            polygon: None,
        });
    }
    Ok(out)
}

/// Read direction rows. Anchor columns hold semicolon-separated packed
/// coordinate identities.
pub fn read_directions(rdr: impl Read) -> Result<Vec<DirectionEntry>> {
    let mut out = Vec::new();
    for row in csv::Reader::from_reader(rdr).deserialize() {
        let row: DirectionRow = row?;
        let mut anchors = Vec::new();
        for part in unpack_opt(row.anchors.as_deref()) {
            let cid = part
                .parse::<u64>()
                .map_err(|_| GazetteerError::InvalidColumn {
                    domain: "direction",
                    column: "anchors",
                    value: part.clone(),
                })?;
            anchors.push(cid);
        }
        out.push(DirectionEntry {
            aliases: unpack_opt(row.aliases.as_deref()),
            name: row.name,
            anchors,
        });
    }
    Ok(out)
}

// ============================================================================
// FILE-LEVEL LOADING
// ============================================================================

/// Canonical lookup-table file names under a gazetteer directory.
pub const LOCALE_LOOKUP: &str = "locale_lookup.csv";
pub const REGION_LOOKUP: &str = "region_lookup.csv";
pub const GROUP_LOOKUP: &str = "group_lookup.csv";
pub const DIRECTION_LOOKUP: &str = "direction_lookup.csv";

/// Load the four canonical lookup tables from a directory and build the
/// index. A group geometry file is optional; pass it separately through
/// [`attach_group_polygons`] before indexing if AO hit-tests are needed.
pub fn load_canonical(dir: &Path) -> Result<GazetteerIndex> {
    let locales = read_locales(File::open(dir.join(LOCALE_LOOKUP))?)?;
    let regions = read_regions(File::open(dir.join(REGION_LOOKUP))?)?;
    let groups = read_groups(File::open(dir.join(GROUP_LOOKUP))?)?;
    let directions = read_directions(File::open(dir.join(DIRECTION_LOOKUP))?)?;

    tracing::info!(
        locales = locales.len(),
        regions = regions.len(),
        groups = groups.len(),
        directions = directions.len(),
        "gazetteer lookup tables loaded"
    );

    GazetteerIndex::new(locales, regions, groups, directions)
}

/// Load a locale patch CSV.
pub fn load_locale_patch(path: &Path) -> Result<Vec<LocaleEntry>> {
    read_locales(File::open(path)?)
}

/// Write locales back out as a patch CSV with packed alias columns.
pub fn dump_locale_patch(entries: &[LocaleEntry], out: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for entry in entries {
        wtr.serialize(LocalePatchRow {
            name: &entry.name,
            aliases: pack_aliases(&entry.aliases),
            lon: entry.lon,
            lat: entry.lat,
            cid: entry.cid,
            region: entry.region.as_deref(),
            ru_group: entry.ru_group.as_deref(),
            place: entry.place.as_deref(),
            wikidata: entry.wikidata.as_deref(),
            usage: entry.usage,
            source: &entry.source,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Attach AO polygons to groups from a geographic-JSON feature
/// collection whose features carry a `name` property. Returns the number
/// of groups that received a polygon.
pub fn attach_group_polygons(groups: &mut [GroupEntry], geojson_src: &str) -> Result<usize> {
    let fc: FeatureCollection = serde_json::from_str(geojson_src)
        .map_err(|e| GazetteerError::Geometry(e.to_string()))?;

    let mut attached = 0;
    for feature in &fc.features {
        let Some(name) = feature.name() else {
            continue;
        };
        let Some(polygon) = feature.geometry.as_ref().and_then(|g| g.polygon()) else {
            continue;
        };

        let key = normalize_location_key(name);
        match groups
            .iter_mut()
            .find(|g| normalize_location_key(&g.name) == key)
        {
            Some(group) => {
                group.polygon = Some(polygon);
                attached += 1;
            }
            None => {
                tracing::warn!(feature = %name, "AO polygon matches no group");
            }
        }
    }

    Ok(attached)
}
