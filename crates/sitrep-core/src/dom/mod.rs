//! DOM Module
//!
//! The snapshot-versioned claim tree: POST → SECTION → EVENT →
//! LOCATION_SERIES → LOCATION. Tree structure is immutable across
//! snapshots; per-node state clones forward on each lifecycle advance.
//! This module owns the lifecycle types, the LSS↔DOM bindings,
//! dominance-resolved context materialization, and the commit
//! eligibility rule; the ingest and snapshot transactions themselves
//! live in the store.

mod binding;
mod context;
mod eligibility;
mod node;

pub use binding::{build_bindings, DomError, NodeBindings, Result};
pub use context::materialize_contexts;
pub use eligibility::{commit_eligibility, recompute_commit_eligibility};
pub use node::{IneligibleReason, LifecycleStage, NodeType};
