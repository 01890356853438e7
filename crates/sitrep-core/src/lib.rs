//! # Sitrep Core
//!
//! Situation-report distillation engine. Ingests free-form multilingual
//! situation-report posts and incrementally distills them into a
//! reviewable, auditable tree of structured claims:
//!
//! - **LSS (Linguistic-Structural Scoping)**: deterministic post-NLP
//!   stage producing events, role candidates, ordered location series,
//!   and context hints scoped at the tightest defensible structural
//!   level
//! - **Claim DOM**: a snapshot-versioned POST → SECTION → EVENT →
//!   LOCATION_SERIES → LOCATION tree with monotonic lifecycle stages
//!   (CREATED → INITIAL_REVIEW → PROCESSED → FINAL_REVIEW → AUDIT) and
//!   dominance-resolved inherited context
//! - **Gazetteer resolution**: alias-indexed lookup plus multi-signal
//!   candidate narrowing and scoring (region hard filter, operational-
//!   group AO polygon + buffer, proximity anchor, direction axis,
//!   frontline distance, series clustering)
//!
//! NLP itself is external: an opaque linguistic annotator supplies
//! typed matches and an entity layer ([`annotate`]); everything
//! downstream is deterministic and idempotent per stage.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sitrep_core::{Pipeline, Store};
//! use sitrep_core::gazetteer::load_canonical;
//! use sitrep_core::spatial::Frontline;
//!
//! let store = Store::open("records.db".as_ref())?;
//! let gazetteer = load_canonical("gazetteer/".as_ref())?;
//! let frontline = Frontline::from_geojson_str(&std::fs::read_to_string("loc.geojson")?)?;
//!
//! let pipeline = Pipeline::new(&store, &gazetteer, Some(&frontline));
//! let report = pipeline.process_post(post_id, &doc, &matches)?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod annotate;
pub mod dom;
pub mod gazetteer;
pub mod lss;
pub mod pipeline;
pub mod resolve;
pub mod spatial;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Annotator contract
pub use annotate::{AnnotatedDoc, AnnotatorMatch, EntityLabel, EntitySpan, Token, WordMatch};

// Gazetteer
pub use gazetteer::{
    decode_coord, encode_coord, normalize_location_key, DirectionEntry, GazetteerError,
    GazetteerIndex, GroupEntry, LocaleEntry, RegionEntry,
};

// Spatial primitives
pub use spatial::{haversine_km, AxisProjection, DirectionAxis, Frontline, SpatialError};

// LSS
pub use lss::{
    run_lss, CtxKind, CtxScope, EventMatch, HintSource, LssConfig, LssContextHint, LssError,
    LssLocationItem, LssLocationSeries, LssOutcome, LssRoleCandidate, LssRunSummary, LssSection,
    RoleKind, ScopedEvent,
};

// DOM
pub use dom::{
    materialize_contexts, recompute_commit_eligibility, DomError, IneligibleReason,
    LifecycleStage, NodeType,
};

// Resolution
pub use resolve::{
    resolve_candidates, resolve_snapshot, score_location, CandidateSignals, EffectiveContexts,
    LocaleCandidate, ResolutionOutcome, ResolveConfig, ResolveError, ResolveSummary, ScoreWeights,
};

// Storage layer
pub use storage::{
    MaterializeOutcome, NewIngestPost, SnapshotRowCounts, StorageError, Store,
};

// Pipeline driver
pub use pipeline::{Pipeline, PipelineError, PostReport};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AnnotatedDoc, AnnotatorMatch, CtxKind, CtxScope, GazetteerIndex, LifecycleStage,
        LssConfig, NodeType, Pipeline, PipelineError, ResolveConfig, RoleKind, Store,
    };
}
