//! LSS Module — Linguistic-Structural Scoping
//!
//! Deterministic post-NLP stage: structural sectioning, event-bounded
//! role/location/context extraction, series grouping, retroactive
//! qualifier redistribution, and the mandatory context lattice.

mod contextualize;
mod pipeline;
mod scoping;
mod sectioning;
mod types;

pub use contextualize::contextualize;
pub use pipeline::{run_lss, LssConfig, LssError, LssOutcome, LssRunSummary, Result};
pub use scoping::{scope_event, EventScoping, SERIES_JOIN_TOKENS};
pub use sectioning::split_into_sections;
pub use types::{
    CtxKind, CtxScope, EventMatch, HintSource, LssContextHint, LssLocationItem,
    LssLocationSeries, LssRoleCandidate, LssSection, RoleKind, ScopedEvent,
};
