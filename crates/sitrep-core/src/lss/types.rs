//! LSS Data Contracts (Structural, Canonical)
//!
//! Invariants:
//! - Role candidates are semantic only (ACTOR / ACTION)
//! - Locations are never role candidates; they exist only as
//!   [`LssLocationItem`]s inside [`LssLocationSeries`]
//! - `series_id` and `item_id` are ordinals local to a single event
//! - Context is attached at the lowest defensible structural level

use serde::{Deserialize, Serialize};

// ============================================================================
// TAGGED VARIANTS
// ============================================================================

/// Participant role kinds. LOCATION is never a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKind {
    Actor,
    Action,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Actor => "ACTOR",
            RoleKind::Action => "ACTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTOR" => Some(RoleKind::Actor),
            "ACTION" => Some(RoleKind::Action),
            _ => None,
        }
    }

    /// Infer a role kind from a pattern-element match type. Match types
    /// outside the two recognized sets carry no role.
    pub fn from_match_type(match_type: &str) -> Option<Self> {
        match match_type.to_lowercase().as_str() {
            "subject" | "actor" | "object" | "dobj" | "possessor" => Some(RoleKind::Actor),
            "verb" | "action" => Some(RoleKind::Action),
            _ => None,
        }
    }
}

/// Context qualifier kinds.
///
/// REGION / GROUP / DIRECTION arrive from the gazetteer entity layer,
/// PROXIMITY and free labels from the annotator's `CONTEXT:*` matches.
/// MARKER is the placeholder kind used by lattice synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CtxKind {
    Region,
    Group,
    Direction,
    Proximity,
    Marker,
    Label(String),
}

impl CtxKind {
    pub fn as_str(&self) -> &str {
        match self {
            CtxKind::Region => "REGION",
            CtxKind::Group => "GROUP",
            CtxKind::Direction => "DIRECTION",
            CtxKind::Proximity => "PROXIMITY",
            CtxKind::Marker => "MARKER",
            CtxKind::Label(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "REGION" => CtxKind::Region,
            "GROUP" => CtxKind::Group,
            "DIRECTION" => CtxKind::Direction,
            "PROXIMITY" => CtxKind::Proximity,
            "MARKER" => CtxKind::Marker,
            other => CtxKind::Label(other.to_string()),
        }
    }
}

/// Structural level a context hint applies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CtxScope {
    Location,
    Series,
    Event,
    Section,
    Post,
}

impl CtxScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CtxScope::Location => "LOCATION",
            CtxScope::Series => "SERIES",
            CtxScope::Event => "EVENT",
            CtxScope::Section => "SECTION",
            CtxScope::Post => "POST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOCATION" => Some(CtxScope::Location),
            "SERIES" => Some(CtxScope::Series),
            "EVENT" => Some(CtxScope::Event),
            "SECTION" => Some(CtxScope::Section),
            "POST" => Some(CtxScope::Post),
            _ => None,
        }
    }
}

/// Where a context hint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HintSource {
    Gazetteer,
    Annotator,
    Synthetic,
}

impl HintSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HintSource::Gazetteer => "GAZETTEER",
            HintSource::Annotator => "ANNOTATOR",
            HintSource::Synthetic => "SYNTHETIC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GAZETTEER" => Some(HintSource::Gazetteer),
            "ANNOTATOR" => Some(HintSource::Annotator),
            "SYNTHETIC" => Some(HintSource::Synthetic),
            _ => None,
        }
    }
}

// ============================================================================
// STRUCTURAL RECORDS
// ============================================================================

/// Pure structural section emitted by sectioning.
///
/// Identity is assigned only at persistence time; token alignment is
/// resolved downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LssSection {
    pub ordinal: usize,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// A semantic event candidate accepted from the annotator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMatch {
    /// Stable string identity: `<ingest_post_id>:<in-post ordinal>`
    pub event_uid: String,
    /// Full `EVENT:`-prefixed label
    pub label: String,
    /// Catalog phrase that matched
    pub search_phrase: String,
    /// Sentence text of the match
    pub text: String,
    pub similarity: f64,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
    /// Document token span `[start, end)`
    pub start_token: usize,
    pub end_token: usize,
}

/// A structurally valid participant, owned by one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LssRoleCandidate {
    pub role_kind: RoleKind,
    /// Matched document word
    pub document_word: String,
    /// Surface text (full phrase when available)
    pub text: String,
    pub start_token: usize,
    pub end_token: usize,
    pub match_type: String,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
    pub similarity: f64,
    pub explanation: String,
}

/// One surface location mention inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LssLocationItem {
    /// Ordinal local to the event, monotone across all series
    pub item_id: usize,
    pub text: String,
    pub start_token: usize,
    pub end_token: usize,
}

/// An ordered syntactic series of location mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LssLocationSeries {
    /// Ordinal local to the event
    pub series_id: usize,
    pub items: Vec<LssLocationItem>,
    pub start_token: usize,
    pub end_token: usize,
}

/// A qualifier scoped at the tightest defensible structural level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LssContextHint {
    pub ctx_kind: CtxKind,
    pub text: String,
    pub start_token: Option<usize>,
    pub end_token: Option<usize>,
    pub scope: CtxScope,
    /// Ordinal of the target within its scope; `None` for POST
    pub target_id: Option<usize>,
    pub source: HintSource,
}

/// One scoped event: the match plus everything structural scoping
/// extracted for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopedEvent {
    pub event: EventMatch,
    pub roles: Vec<LssRoleCandidate>,
    pub series: Vec<LssLocationSeries>,
    pub hints: Vec<LssContextHint>,
}
