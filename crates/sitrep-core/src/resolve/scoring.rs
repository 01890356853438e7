//! Candidate Generation and Scoring
//!
//! Stage 1: region-aware candidate generation (hard filter, naive
//! fallback). Stage 2: group tag intersection (fallback preserves
//! safety). Stage 3: proximity narrowing around a resolved anchor.
//! Stage 4: named score contributions — region match/neighbor, group AO
//! polygon and name alignment, proximity, direction cross-axis bands.
//! Frontline distance and axis projections are recorded as diagnostics.

use std::collections::BTreeMap;

use geo::{ClosestPoint, Contains, LineString, Point, Polygon};

use crate::gazetteer::{normalize_location_key, GazetteerIndex, GroupEntry, LocaleEntry};
use crate::resolve::contexts::EffectiveContexts;
use crate::resolve::{
    ResolveConfig, ResolveError, Result, DIAG_DIR_ALONG_KM, DIAG_DIR_CROSS_KM, DIAG_FRONTLINE_KM,
    DIAG_PROX_KM, SIG_DIRECTION_AXIS, SIG_GROUP_NAME_MATCH, SIG_GROUP_POLYGON, SIG_PROXIMITY,
    SIG_REGION_MATCH, SIG_REGION_NEIGHBOR,
};
use crate::spatial::{haversine_km, metric, DirectionAxis, Frontline};

/// A possible resolution for one location mention, with its accumulated
/// score contributions and diagnostics. Persists through the workflow
/// for review.
#[derive(Debug, Clone)]
pub struct LocaleCandidate {
    pub locale: LocaleEntry,
    /// Named score contributions; the sum is the final rank
    pub contributions: BTreeMap<String, f64>,
    /// Recorded measurements that do not enter the score
    pub diagnostics: BTreeMap<String, f64>,
    pub cluster_outlier: bool,
}

impl LocaleCandidate {
    fn new(locale: LocaleEntry) -> Self {
        Self {
            locale,
            contributions: BTreeMap::new(),
            diagnostics: BTreeMap::new(),
            cluster_outlier: false,
        }
    }

    /// Final rank: the sum of all contributions.
    pub fn total_score(&self) -> f64 {
        self.contributions.values().sum()
    }

    /// The highest-contribution signal name, if any.
    pub fn top_signal(&self) -> Option<&str> {
        self.contributions
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, _)| name.as_str())
    }
}

/// Generate, narrow, and score candidates for one location surface
/// form under its effective contexts. Deterministic given identical
/// inputs; the returned list is rank-ordered.
pub fn score_location(
    gaz: &GazetteerIndex,
    frontline: Option<&Frontline>,
    config: &ResolveConfig,
    text: &str,
    ctx: &EffectiveContexts,
) -> Result<Vec<LocaleCandidate>> {
    // --------------------------------------------------------------
    // Stage 1 — candidate generation (region hard filter, fallback)
    // --------------------------------------------------------------

    let base_entries: Vec<&LocaleEntry> = match ctx.region.as_deref() {
        Some(region) => {
            let filtered = gaz.search_locale_in_region(text, region);
            if filtered.is_empty() {
                tracing::warn!(text, region, "region filter emptied candidates; falling back");
                gaz.search_locale(text)
            } else {
                filtered
            }
        }
        None => gaz.search_locale(text),
    };

    let mut candidates: Vec<LocaleCandidate> = Vec::new();
    let mut seen_cids = std::collections::HashSet::new();
    for entry in base_entries {
        if seen_cids.insert(entry.cid) {
            candidates.push(LocaleCandidate::new(entry.clone()));
        }
    }
    if candidates.is_empty() {
        return Ok(candidates);
    }

    // --------------------------------------------------------------
    // Region scoring
    // --------------------------------------------------------------

    if let Some(region_text) = ctx.region.as_deref() {
        let region_entry = gaz.search_region(region_text);
        let canonical = region_entry
            .map(|r| normalize_location_key(&r.name))
            .unwrap_or_else(|| normalize_location_key(region_text));
        let neighbors: std::collections::HashSet<String> = region_entry
            .map(|r| r.neighbors.iter().map(|n| normalize_location_key(n)).collect())
            .unwrap_or_default();

        for cand in &mut candidates {
            let Some(cand_region) = cand.locale.region.as_deref() else {
                continue;
            };
            let key = normalize_location_key(cand_region);
            if key == canonical {
                cand.contributions
                    .insert(SIG_REGION_MATCH.to_string(), config.weights.region_match);
            } else if neighbors.contains(&key) {
                cand.contributions.insert(
                    SIG_REGION_NEIGHBOR.to_string(),
                    config.weights.region_neighbor,
                );
            }
        }
    }

    // --------------------------------------------------------------
    // Stage 2 + group scoring — tag intersection, AO membership and
    // polygon hit-test; an emptied set falls back to the base list
    // --------------------------------------------------------------

    if let Some(group_text) = ctx.group.as_deref() {
        let before_group = candidates.clone();
        let group_entry = gaz.search_group(group_text);
        let canonical = group_entry
            .map(|g| normalize_location_key(&g.name))
            .unwrap_or_else(|| normalize_location_key(group_text));

        let tagged: Vec<LocaleCandidate> = candidates
            .iter()
            .filter(|c| {
                c.locale
                    .ru_group
                    .as_deref()
                    .is_some_and(|g| normalize_location_key(g) == canonical)
            })
            .cloned()
            .collect();
        if !tagged.is_empty() {
            candidates = tagged;
        }

        if let Some(group) = group_entry {
            let mut scoped: Vec<LocaleCandidate> = Vec::new();

            for mut cand in candidates.clone() {
                if !group_region_admits(gaz, group, cand.locale.region.as_deref()) {
                    continue;
                }

                if let Some(polygon) = &group.polygon {
                    let dist =
                        polygon_distance_km(polygon, cand.locale.lat, cand.locale.lon);
                    if dist > config.group_buffer_km {
                        continue;
                    }
                    let bonus = if dist == 0.0 {
                        config.weights.group_polygon_inside
                    } else {
                        config.weights.group_polygon_buffer
                    };
                    cand.contributions
                        .insert(SIG_GROUP_POLYGON.to_string(), bonus);
                }

                if cand
                    .locale
                    .ru_group
                    .as_deref()
                    .is_some_and(|g| normalize_location_key(g) == canonical)
                {
                    cand.contributions.insert(
                        SIG_GROUP_NAME_MATCH.to_string(),
                        config.weights.group_name_match,
                    );
                }

                scoped.push(cand);
            }

            if scoped.is_empty() {
                tracing::warn!(text, group = %group.name, "group scope emptied candidates; retaining base");
                candidates = before_group;
            } else {
                candidates = scoped;
            }
        }
    }

    // --------------------------------------------------------------
    // Stage 3 — proximity narrowing around a resolved anchor
    // --------------------------------------------------------------

    if let Some((anchor_lat, anchor_lon)) = resolve_anchor(gaz, ctx)? {
        for cand in &mut candidates {
            let d = haversine_km(anchor_lat, anchor_lon, cand.locale.lat, cand.locale.lon);
            cand.diagnostics.insert(DIAG_PROX_KM.to_string(), d);
        }

        let within: Vec<LocaleCandidate> = candidates
            .iter()
            .filter(|c| c.diagnostics[DIAG_PROX_KM] <= config.proximity_radius_km)
            .cloned()
            .collect();

        if within.is_empty() {
            // Keep the nearest few rather than discarding everything
            candidates.sort_by(|a, b| {
                a.diagnostics[DIAG_PROX_KM].total_cmp(&b.diagnostics[DIAG_PROX_KM])
            });
            candidates.truncate(5);
            for cand in &mut candidates {
                cand.contributions
                    .insert(SIG_PROXIMITY.to_string(), config.weights.proximity_beyond);
            }
        } else {
            candidates = within;
            for cand in &mut candidates {
                cand.contributions
                    .insert(SIG_PROXIMITY.to_string(), config.weights.proximity_within);
            }
        }
    }

    // --------------------------------------------------------------
    // Direction axis scoring (never a filter)
    // --------------------------------------------------------------

    if let (Some(direction_text), Some(frontline)) = (ctx.direction.as_deref(), frontline) {
        if let Some(direction) = gaz.search_direction(direction_text) {
            for &cid in &direction.anchors {
                let Some(city) = gaz.locale_by_cid(cid) else {
                    return Err(ResolveError::MissingAnchor {
                        direction: direction.name.clone(),
                        cid,
                    });
                };
                let Some(axis) = DirectionAxis::build(frontline, city.lat, city.lon) else {
                    continue;
                };

                for cand in &mut candidates {
                    let proj = axis.project(cand.locale.lat, cand.locale.lon);
                    cand.diagnostics
                        .insert(DIAG_DIR_ALONG_KM.to_string(), proj.along_km);
                    cand.diagnostics
                        .insert(DIAG_DIR_CROSS_KM.to_string(), proj.cross_km);

                    let w = &config.weights;
                    let bonus = if proj.cross_km < w.direction_cross_near_km {
                        w.direction_bonus_near
                    } else if proj.cross_km < w.direction_cross_mid_km {
                        w.direction_bonus_mid
                    } else if proj.cross_km < w.direction_cross_far_km {
                        w.direction_bonus_far
                    } else {
                        w.direction_penalty_beyond
                    };
                    cand.contributions
                        .insert(SIG_DIRECTION_AXIS.to_string(), bonus);
                }
                break;
            }
        } else {
            tracing::warn!(direction = direction_text, "direction context matches no entry");
        }
    }

    // --------------------------------------------------------------
    // Frontline distance diagnostic
    // --------------------------------------------------------------

    if let Some(frontline) = frontline {
        for cand in &mut candidates {
            if let Some(d) = frontline.shortest_distance_km(cand.locale.lat, cand.locale.lon) {
                cand.diagnostics.insert(DIAG_FRONTLINE_KM.to_string(), d);
            }
        }
    }

    // Rank order: score descending, cid ascending for determinism
    candidates.sort_by(|a, b| {
        b.total_score()
            .total_cmp(&a.total_score())
            .then(a.locale.cid.cmp(&b.locale.cid))
    });

    Ok(candidates)
}

/// A candidate's region admits it to GROUP scope when it is a member
/// region of the group, or a member region of any neighboring group.
fn group_region_admits(
    gaz: &GazetteerIndex,
    group: &GroupEntry,
    region: Option<&str>,
) -> bool {
    let Some(region) = region else {
        // Unregioned locales cannot be membership-checked; admit them
        // and let geometry decide
        return true;
    };
    let key = normalize_location_key(region);

    if group
        .regions
        .iter()
        .any(|r| normalize_location_key(r) == key)
    {
        return true;
    }

    group.neighbors.iter().any(|neighbor| {
        gaz.search_group(neighbor).is_some_and(|g| {
            g.regions.iter().any(|r| normalize_location_key(r) == key)
        })
    })
}

/// The anchor for proximity narrowing: an unambiguous PROXIMITY locale
/// hit, else the first DIRECTION anchor city.
fn resolve_anchor(
    gaz: &GazetteerIndex,
    ctx: &EffectiveContexts,
) -> Result<Option<(f64, f64)>> {
    if let Some(proximity_text) = ctx.proximity.as_deref() {
        let hits = gaz.search_locale(proximity_text);
        match hits.as_slice() {
            [only] => return Ok(Some((only.lat, only.lon))),
            [] => tracing::warn!(anchor = proximity_text, "proximity anchor not in gazetteer"),
            _ => tracing::warn!(anchor = proximity_text, "proximity anchor ambiguous; ignored"),
        }
    }

    if let Some(direction_text) = ctx.direction.as_deref() {
        if let Some(direction) = gaz.search_direction(direction_text) {
            if let Some(&cid) = direction.anchors.first() {
                let Some(city) = gaz.locale_by_cid(cid) else {
                    return Err(ResolveError::MissingAnchor {
                        direction: direction.name.clone(),
                        cid,
                    });
                };
                return Ok(Some((city.lat, city.lon)));
            }
        }
    }

    Ok(None)
}

/// Geodesic distance from a point to an AO polygon; zero inside.
fn polygon_distance_km(polygon: &Polygon<f64>, lat: f64, lon: f64) -> f64 {
    let pt = Point::new(lon, lat);
    if polygon.contains(&pt) {
        return 0.0;
    }

    // Nearest boundary point in metric space, measured geodesically
    let metric_ring: LineString<f64> = LineString::from(
        polygon
            .exterior()
            .coords()
            .map(|c| metric::to_metric(c.x, c.y))
            .collect::<Vec<_>>(),
    );
    let metric_pt = Point::from(metric::to_metric(lon, lat));
    match metric_ring.closest_point(&metric_pt) {
        geo::Closest::Intersection(p) | geo::Closest::SinglePoint(p) => {
            let (blon, blat) = metric::to_wgs84(p.x(), p.y());
            haversine_km(lat, lon, blat, blon)
        }
        geo::Closest::Indeterminate => f64::INFINITY,
    }
}
