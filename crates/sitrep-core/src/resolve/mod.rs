//! Candidate Narrowing, Scoring, and Resolution
//!
//! Per LOCATION node at DOM stage PROCESSED: generate locale candidates
//! from the gazetteer, narrow by inherited REGION/GROUP/PROXIMITY
//! context, accumulate named score contributions, flag cluster
//! outliers per series, and resolve nodes with a unique above-threshold
//! top candidate. Scores are deterministic given identical inputs.

mod contexts;
mod resolution;
mod scoring;
mod snapshot;

pub use contexts::EffectiveContexts;
pub use resolution::{resolve_candidates, ResolutionOutcome};
pub use scoring::{score_location, LocaleCandidate};
pub use snapshot::{resolve_snapshot, ResolveSummary};

use serde::{Deserialize, Serialize};

use crate::dom::DomError;
use crate::storage::StorageError;

// ============================================================================
// SIGNAL NAMES
// ============================================================================

/// Candidate region equals the REGION context.
pub const SIG_REGION_MATCH: &str = "region_match";
/// Candidate region is a declared neighbor of the REGION context.
pub const SIG_REGION_NEIGHBOR: &str = "region_neighbor";
/// Candidate point against the GROUP AO polygon (inside or buffer).
pub const SIG_GROUP_POLYGON: &str = "group_polygon";
/// Candidate's recorded operational-group name equals the GROUP context.
pub const SIG_GROUP_NAME_MATCH: &str = "group_ru_group_match";
/// Distance to the proximity anchor against the narrowing radius.
pub const SIG_PROXIMITY: &str = "proximity";
/// Cross-axis distance band against the direction axis.
pub const SIG_DIRECTION_AXIS: &str = "direction_axis";

/// Diagnostic keys recorded alongside contributions.
pub const DIAG_PROX_KM: &str = "prox_km";
pub const DIAG_DIR_ALONG_KM: &str = "dir_along_km";
pub const DIAG_DIR_CROSS_KM: &str = "dir_cross_km";
pub const DIAG_FRONTLINE_KM: &str = "distance_from_frontline_km";

// ============================================================================
// ERRORS
// ============================================================================

/// Resolve error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// DOM binding failure
    #[error(transparent)]
    Dom(#[from] DomError),
    /// A DIRECTION anchor references a locale identity absent from the
    /// gazetteer
    #[error("direction '{direction}' anchor cid {cid} not in gazetteer")]
    MissingAnchor { direction: String, cid: u64 },
    /// JSON error while serializing signals
    #[error("signals JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve result type
pub type Result<T> = std::result::Result<T, ResolveError>;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Score contributions. The defaults are the calibrated production
/// values; all of them are configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub region_match: f64,
    pub region_neighbor: f64,
    pub group_polygon_inside: f64,
    pub group_polygon_buffer: f64,
    pub group_name_match: f64,
    pub proximity_within: f64,
    pub proximity_beyond: f64,
    /// Cross-axis band edges, km
    pub direction_cross_near_km: f64,
    pub direction_cross_mid_km: f64,
    pub direction_cross_far_km: f64,
    /// Band bonuses, nearest band first; beyond the far band penalizes
    pub direction_bonus_near: f64,
    pub direction_bonus_mid: f64,
    pub direction_bonus_far: f64,
    pub direction_penalty_beyond: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            region_match: 1.0,
            region_neighbor: 0.25,
            group_polygon_inside: 0.40,
            group_polygon_buffer: 0.10,
            group_name_match: 0.50,
            proximity_within: 0.40,
            proximity_beyond: -0.20,
            direction_cross_near_km: 5.0,
            direction_cross_mid_km: 10.0,
            direction_cross_far_km: 20.0,
            direction_bonus_near: 0.30,
            direction_bonus_mid: 0.15,
            direction_bonus_far: 0.05,
            direction_penalty_beyond: -0.05,
        }
    }
}

/// Narrowing and resolution knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Proximity narrowing radius, km
    pub proximity_radius_km: f64,
    /// GROUP AO polygon buffer, km
    pub group_buffer_km: f64,
    /// Minimum top score for a LOCATION to resolve
    pub resolution_threshold: f64,
    /// Additive margin over the median inter-sibling distance, km
    pub cluster_outlier_margin_km: f64,
    pub weights: ScoreWeights,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            proximity_radius_km: 50.0,
            group_buffer_km: 10.0,
            resolution_threshold: 0.5,
            cluster_outlier_margin_km: 5.0,
            weights: ScoreWeights::default(),
        }
    }
}

/// The persisted shape of `dom_location_candidate.signals_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSignals {
    pub contributions: std::collections::BTreeMap<String, f64>,
    pub diagnostics: std::collections::BTreeMap<String, f64>,
    pub cluster_outlier: bool,
}
