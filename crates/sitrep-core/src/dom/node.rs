//! DOM Node and Lifecycle Types
//!
//! The DOM is an arena of typed nodes (parent ids + sibling ordinals,
//! no pointers) versioned by snapshots pinned to a monotonic lifecycle.

use serde::{Deserialize, Serialize};

/// DOM node types, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Post,
    Section,
    Event,
    LocationSeries,
    Location,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Post => "POST",
            NodeType::Section => "SECTION",
            NodeType::Event => "EVENT",
            NodeType::LocationSeries => "LOCATION_SERIES",
            NodeType::Location => "LOCATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "POST" => Some(NodeType::Post),
            "SECTION" => Some(NodeType::Section),
            "EVENT" => Some(NodeType::Event),
            "LOCATION_SERIES" => Some(NodeType::LocationSeries),
            "LOCATION" => Some(NodeType::Location),
            _ => None,
        }
    }
}

/// Lifecycle stages form a strictly linear chain; only adjacent forward
/// transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    Created,
    InitialReview,
    Processed,
    FinalReview,
    Audit,
}

impl LifecycleStage {
    /// Seeded row id in `dom_lifecycle_stage`.
    pub fn id(&self) -> i64 {
        match self {
            LifecycleStage::Created => 1,
            LifecycleStage::InitialReview => 2,
            LifecycleStage::Processed => 3,
            LifecycleStage::FinalReview => 4,
            LifecycleStage::Audit => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(LifecycleStage::Created),
            2 => Some(LifecycleStage::InitialReview),
            3 => Some(LifecycleStage::Processed),
            4 => Some(LifecycleStage::FinalReview),
            5 => Some(LifecycleStage::Audit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Created => "CREATED",
            LifecycleStage::InitialReview => "INITIAL_REVIEW",
            LifecycleStage::Processed => "PROCESSED",
            LifecycleStage::FinalReview => "FINAL_REVIEW",
            LifecycleStage::Audit => "AUDIT",
        }
    }

    /// The next stage in the chain; `None` at AUDIT.
    pub fn next(&self) -> Option<Self> {
        match self {
            LifecycleStage::Created => Some(LifecycleStage::InitialReview),
            LifecycleStage::InitialReview => Some(LifecycleStage::Processed),
            LifecycleStage::Processed => Some(LifecycleStage::FinalReview),
            LifecycleStage::FinalReview => Some(LifecycleStage::Audit),
            LifecycleStage::Audit => None,
        }
    }
}

/// Why a node was excluded from commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibleReason {
    Deselected,
    Unresolved,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IneligibleReason::Deselected => "DESELECTED",
            IneligibleReason::Unresolved => "UNRESOLVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DESELECTED" => Some(IneligibleReason::Deselected),
            "UNRESOLVED" => Some(IneligibleReason::Unresolved),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_chain_is_linear() {
        let mut stage = LifecycleStage::Created;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert_eq!(next.id(), stage.id() + 1);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(stage, LifecycleStage::Audit);
        assert!(stage.next().is_none());
    }

    #[test]
    fn test_stage_id_roundtrip() {
        for id in 1..=5 {
            assert_eq!(LifecycleStage::from_id(id).map(|s| s.id()), Some(id));
        }
        assert!(LifecycleStage::from_id(6).is_none());
    }

    #[test]
    fn test_node_type_roundtrip() {
        for nt in [
            NodeType::Post,
            NodeType::Section,
            NodeType::Event,
            NodeType::LocationSeries,
            NodeType::Location,
        ] {
            assert_eq!(NodeType::parse(nt.as_str()), Some(nt));
        }
        assert!(NodeType::parse("ACTOR").is_none());
    }
}
