//! Gazetteer Index
//!
//! In-memory alias→entity resolution plus linear geospatial scans over
//! LOCATION entities. The index is read-only after construction and may
//! be shared across per-post workers without locking.

use std::collections::HashMap;

use crate::gazetteer::alias::normalize_location_key;
use crate::gazetteer::coord::decode_coord;
use crate::gazetteer::entry::{DirectionEntry, GroupEntry, LocaleEntry, RegionEntry};
use crate::spatial::haversine_km;

/// Gazetteer error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GazetteerError {
    /// Two distinct entities in a uniqueness-enforcing domain share a
    /// normalized alias
    #[error("duplicate {domain} alias '{alias}' maps to both '{existing}' and '{incoming}'")]
    DuplicateAlias {
        domain: &'static str,
        alias: String,
        existing: String,
        incoming: String,
    },
    /// CSV parse failure
    #[error("gazetteer CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Malformed numeric column
    #[error("invalid {column} value '{value}' in {domain} table")]
    InvalidColumn {
        domain: &'static str,
        column: &'static str,
        value: String,
    },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed geometry source
    #[error("geometry error: {0}")]
    Geometry(String),
}

/// Gazetteer result type
pub type Result<T> = std::result::Result<T, GazetteerError>;

/// In-memory index for locales, regions, groups, and directions.
pub struct GazetteerIndex {
    locales: Vec<LocaleEntry>,
    regions: Vec<RegionEntry>,
    groups: Vec<GroupEntry>,
    directions: Vec<DirectionEntry>,

    // alias key → locale indices (duplicates allowed)
    locale_by_alias: HashMap<String, Vec<usize>>,
    // alias key → entity index (unique per domain)
    region_by_alias: HashMap<String, usize>,
    group_by_alias: HashMap<String, usize>,
    direction_by_alias: HashMap<String, usize>,
    // region key → locale indices
    locale_by_region: HashMap<String, Vec<usize>>,
    // packed coordinate identity → locale index
    locale_by_cid: HashMap<u64, usize>,
}

impl GazetteerIndex {
    /// Build the index from entry lists.
    ///
    /// Duplicate normalized aliases across distinct REGION or DIRECTION
    /// entities are a load-time error. LOCATION duplicates accumulate;
    /// disambiguation is left to callers.
    pub fn new(
        locales: Vec<LocaleEntry>,
        regions: Vec<RegionEntry>,
        groups: Vec<GroupEntry>,
        directions: Vec<DirectionEntry>,
    ) -> Result<Self> {
        let mut index = Self {
            locales,
            regions,
            groups,
            directions,
            locale_by_alias: HashMap::new(),
            region_by_alias: HashMap::new(),
            group_by_alias: HashMap::new(),
            direction_by_alias: HashMap::new(),
            locale_by_region: HashMap::new(),
            locale_by_cid: HashMap::new(),
        };
        index.build_indexes()?;
        Ok(index)
    }

    fn build_indexes(&mut self) -> Result<()> {
        for (i, loc) in self.locales.iter().enumerate() {
            for alias in &loc.aliases {
                let key = normalize_location_key(alias);
                self.locale_by_alias.entry(key).or_default().push(i);
            }

            if let Some(region) = &loc.region {
                let region_key = normalize_location_key(region);
                self.locale_by_region.entry(region_key).or_default().push(i);
            }

            self.locale_by_cid.insert(loc.cid, i);
        }

        for (i, reg) in self.regions.iter().enumerate() {
            for alias in &reg.aliases {
                let key = normalize_location_key(alias);
                if let Some(&existing) = self.region_by_alias.get(&key) {
                    return Err(GazetteerError::DuplicateAlias {
                        domain: "region",
                        alias: alias.clone(),
                        existing: self.regions[existing].name.clone(),
                        incoming: reg.name.clone(),
                    });
                }
                self.region_by_alias.insert(key, i);
            }
        }

        for (i, group) in self.groups.iter().enumerate() {
            for alias in &group.aliases {
                let key = normalize_location_key(alias);
                if let Some(&existing) = self.group_by_alias.get(&key) {
                    tracing::warn!(
                        alias = %alias,
                        existing = %self.groups[existing].name,
                        incoming = %group.name,
                        "duplicate group alias ignored"
                    );
                    continue;
                }
                self.group_by_alias.insert(key, i);
            }
        }

        for (i, dir) in self.directions.iter().enumerate() {
            for alias in &dir.aliases {
                let key = normalize_location_key(alias);
                if let Some(&existing) = self.direction_by_alias.get(&key) {
                    return Err(GazetteerError::DuplicateAlias {
                        domain: "direction",
                        alias: alias.clone(),
                        existing: self.directions[existing].name.clone(),
                        incoming: dir.name.clone(),
                    });
                }
                self.direction_by_alias.insert(key, i);
            }
        }

        Ok(())
    }

    // ========================================================================
    // LOOKUP API
    // ========================================================================

    /// All LOCATION entities sharing the normalized alias key.
    pub fn search_locale(&self, text: &str) -> Vec<&LocaleEntry> {
        let key = normalize_location_key(text);
        self.locale_by_alias
            .get(&key)
            .map(|ids| ids.iter().map(|&i| &self.locales[i]).collect())
            .unwrap_or_default()
    }

    /// Match a region by name or alias, tolerating " oblast" / " region"
    /// suffixes.
    pub fn search_region(&self, text: &str) -> Option<&RegionEntry> {
        let key = normalize_location_key(text);
        if let Some(&i) = self.region_by_alias.get(&key) {
            return Some(&self.regions[i]);
        }

        for suffix in [" oblast", " region"] {
            if let Some(base) = key.strip_suffix(suffix) {
                if let Some(&i) = self.region_by_alias.get(base.trim_end()) {
                    return Some(&self.regions[i]);
                }
            }
        }

        None
    }

    /// Match a direction by name or alias.
    ///
    /// Supports the natural-language variants "X direction" and
    /// "direction of X".
    pub fn search_direction(&self, text: &str) -> Option<&DirectionEntry> {
        let key = normalize_location_key(text);
        if let Some(&i) = self.direction_by_alias.get(&key) {
            return Some(&self.directions[i]);
        }

        if let Some(base) = key.strip_suffix(" direction") {
            if let Some(&i) = self.direction_by_alias.get(base.trim_end()) {
                return Some(&self.directions[i]);
            }
        }

        if let Some(base) = key.strip_prefix("direction of ") {
            if let Some(&i) = self.direction_by_alias.get(base.trim_start()) {
                return Some(&self.directions[i]);
            }
        }

        None
    }

    /// Match an operational group by name or alias.
    pub fn search_group(&self, text: &str) -> Option<&GroupEntry> {
        let key = normalize_location_key(text);
        self.group_by_alias.get(&key).map(|&i| &self.groups[i])
    }

    /// All locales recorded under the given region.
    pub fn locales_in_region(&self, region_text: &str) -> Vec<&LocaleEntry> {
        let key = normalize_location_key(region_text);
        self.locale_by_region
            .get(&key)
            .map(|ids| ids.iter().map(|&i| &self.locales[i]).collect())
            .unwrap_or_default()
    }

    /// Alias hits restricted to a region.
    pub fn search_locale_in_region(&self, text: &str, region_text: &str) -> Vec<&LocaleEntry> {
        let region_key = normalize_location_key(region_text);
        self.search_locale(text)
            .into_iter()
            .filter(|loc| {
                loc.region
                    .as_deref()
                    .is_some_and(|r| normalize_location_key(r) == region_key)
            })
            .collect()
    }

    /// Alias hits restricted to an operational group.
    pub fn search_locale_in_group(&self, text: &str, group_name: &str) -> Vec<&LocaleEntry> {
        let group_key = normalize_location_key(group_name);
        self.search_locale(text)
            .into_iter()
            .filter(|loc| {
                loc.ru_group
                    .as_deref()
                    .is_some_and(|g| normalize_location_key(g) == group_key)
            })
            .collect()
    }

    pub fn has_locale(&self, text: &str) -> bool {
        !self.search_locale(text).is_empty()
    }

    pub fn has_region(&self, text: &str) -> bool {
        self.search_region(text).is_some()
    }

    /// Locale by packed coordinate identity.
    pub fn locale_by_cid(&self, cid: u64) -> Option<&LocaleEntry> {
        self.locale_by_cid.get(&cid).map(|&i| &self.locales[i])
    }

    // ========================================================================
    // GEOSPATIAL SCANS
    // ========================================================================

    /// The nearest locale to the given coordinate, with its distance.
    pub fn nearest_locale(&self, lat: f64, lon: f64) -> Option<(&LocaleEntry, f64)> {
        self.locales
            .iter()
            .map(|loc| (loc, haversine_km(lat, lon, loc.lat, loc.lon)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Nearest locale to the coordinate decoded from a cid.
    pub fn nearest_locale_by_cid(&self, cid: u64) -> Option<(&LocaleEntry, f64)> {
        let (lat, lon) = decode_coord(cid);
        self.nearest_locale(lat, lon)
    }

    /// The `n` nearest locales, nearest first.
    pub fn nearest_locales(&self, lat: f64, lon: f64, n: usize) -> Vec<(f64, &LocaleEntry)> {
        let mut scored: Vec<(f64, &LocaleEntry)> = self
            .locales
            .iter()
            .map(|loc| (haversine_km(lat, lon, loc.lat, loc.lon), loc))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(n);
        scored
    }

    /// All locales within `km` of the coordinate, nearest first.
    pub fn nearest_locales_within(&self, lat: f64, lon: f64, km: f64) -> Vec<(f64, &LocaleEntry)> {
        let mut out: Vec<(f64, &LocaleEntry)> = self
            .locales
            .iter()
            .filter_map(|loc| {
                let d = haversine_km(lat, lon, loc.lat, loc.lon);
                (d <= km).then_some((d, loc))
            })
            .collect();
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        out
    }

    /// The nearest locale among same-name/alias candidates.
    pub fn nearest_locale_with_name(
        &self,
        name: &str,
        lat: f64,
        lon: f64,
    ) -> Option<(&LocaleEntry, f64)> {
        self.search_locale(name)
            .into_iter()
            .map(|loc| (loc, haversine_km(lat, lon, loc.lat, loc.lon)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Nearest same-name locale measured from another locale, excluding
    /// the source itself. A single-candidate set degenerates to that
    /// candidate at distance zero.
    pub fn nearest_same_name_from_locale(
        &self,
        name: &str,
        source: &LocaleEntry,
    ) -> Option<(&LocaleEntry, f64)> {
        let candidates = self.search_locale(name);

        let best = candidates
            .iter()
            .filter(|loc| loc.cid != source.cid)
            .map(|loc| (*loc, haversine_km(source.lat, source.lon, loc.lat, loc.lon)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some(hit) => Some(hit),
            None if candidates.len() == 1 => Some((candidates[0], 0.0)),
            None => None,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn locales(&self) -> &[LocaleEntry] {
        &self.locales
    }

    pub fn regions(&self) -> &[RegionEntry] {
        &self.regions
    }

    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    pub fn directions(&self) -> &[DirectionEntry] {
        &self.directions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::coord::encode_coord;

    fn locale(name: &str, lat: f64, lon: f64, region: Option<&str>) -> LocaleEntry {
        LocaleEntry {
            name: name.to_string(),
            aliases: vec![name.to_string()],
            lon,
            lat,
            cid: encode_coord(lat, lon),
            region: region.map(str::to_string),
            ru_group: None,
            place: Some("city".to_string()),
            wikidata: None,
            usage: 0,
            source: "base".to_string(),
        }
    }

    fn region(name: &str, neighbors: &[&str]) -> RegionEntry {
        RegionEntry {
            name: name.to_string(),
            aliases: vec![name.to_string()],
            neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
            wikidata: None,
        }
    }

    fn index() -> GazetteerIndex {
        GazetteerIndex::new(
            vec![
                locale("Avdiivka", 48.139732, 37.749458, Some("Donetsk")),
                locale("Marinka", 47.940038, 37.502252, Some("Donetsk")),
                locale("Kupyansk", 49.706396, 37.616626, Some("Kharkiv")),
            ],
            vec![region("Donetsk", &["Zaporizhzhia", "Luhansk"])],
            vec![],
            vec![DirectionEntry {
                name: "Kupyansk".to_string(),
                aliases: vec!["Kupyansk".to_string()],
                anchors: vec![encode_coord(49.706396, 37.616626)],
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_search_locale_by_alias() {
        let idx = index();
        assert_eq!(idx.search_locale("avdiivka").len(), 1);
        assert_eq!(idx.search_locale("AVDIIVKA")[0].name, "Avdiivka");
        assert!(idx.search_locale("nowhere").is_empty());
    }

    #[test]
    fn test_region_suffix_variants() {
        let idx = index();
        assert!(idx.search_region("Donetsk").is_some());
        assert!(idx.search_region("Donetsk Oblast").is_some());
        assert!(idx.search_region("donetsk region").is_some());
        assert!(idx.search_region("Kharkiv Oblast").is_none());
    }

    #[test]
    fn test_direction_variants() {
        let idx = index();
        assert!(idx.search_direction("Kupyansk").is_some());
        assert!(idx.search_direction("Kupyansk direction").is_some());
        assert!(idx.search_direction("direction of Kupyansk").is_some());
        assert!(idx.search_direction("direction of Lyman").is_none());
    }

    #[test]
    fn test_duplicate_region_alias_is_error() {
        let result = GazetteerIndex::new(
            vec![],
            vec![region("Donetsk", &[]), region("Donetsk", &[])],
            vec![],
            vec![],
        );
        assert!(matches!(
            result,
            Err(GazetteerError::DuplicateAlias { domain: "region", .. })
        ));
    }

    #[test]
    fn test_nearest_scans() {
        let idx = index();
        // Near Avdiivka
        let (nearest, d) = idx.nearest_locale(48.10, 37.74).unwrap();
        assert_eq!(nearest.name, "Avdiivka");
        assert!(d < 10.0);

        let top2 = idx.nearest_locales(48.10, 37.74, 2);
        assert_eq!(top2.len(), 2);
        assert!(top2[0].0 <= top2[1].0);

        let within = idx.nearest_locales_within(48.10, 37.74, 5.0);
        assert!(within.len() <= 1);
    }

    #[test]
    fn test_search_locale_in_region() {
        let idx = index();
        assert_eq!(idx.search_locale_in_region("Avdiivka", "Donetsk").len(), 1);
        assert!(idx.search_locale_in_region("Avdiivka", "Kharkiv").is_empty());
    }

    #[test]
    fn test_nearest_same_name_degenerate() {
        let idx = index();
        let source = idx.search_locale("Marinka")[0].clone();
        let (hit, d) = idx.nearest_same_name_from_locale("Marinka", &source).unwrap();
        assert_eq!(hit.cid, source.cid);
        assert_eq!(d, 0.0);
    }
}
