//! Commit Eligibility Rule
//!
//! A node is eligible for commit unless it was deselected by review or
//! is an unresolved LOCATION. The rule is pure; the recompute pass in
//! the pipeline clears and rewrites eligibility rows per snapshot.

use crate::dom::binding::Result;
use crate::dom::node::{IneligibleReason, NodeType};
use crate::storage::{EligibilityRow, Store};

/// Derive eligibility for one node from its snapshot state.
pub fn commit_eligibility(
    node_type: NodeType,
    selected: bool,
    resolved: Option<bool>,
) -> (bool, Option<IneligibleReason>) {
    if !selected {
        return (false, Some(IneligibleReason::Deselected));
    }

    if node_type == NodeType::Location && resolved == Some(false) {
        return (false, Some(IneligibleReason::Unresolved));
    }

    (true, None)
}

/// Clear and rewrite eligibility for every node at a snapshot. Returns
/// the number of rows written.
pub fn recompute_commit_eligibility(store: &Store, snapshot_id: i64) -> Result<usize> {
    let states = store.list_node_states(snapshot_id)?;

    let rows: Vec<EligibilityRow> = states
        .iter()
        .map(|st| {
            let (eligible, reason) = commit_eligibility(st.node_type, st.selected, st.resolved);
            EligibilityRow {
                dom_node_id: st.dom_node_id,
                eligible,
                reason: reason.map(|r| r.as_str().to_string()),
            }
        })
        .collect();

    store.replace_commit_eligibility(snapshot_id, &rows)?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deselected_wins() {
        let (eligible, reason) = commit_eligibility(NodeType::Location, false, Some(false));
        assert!(!eligible);
        assert_eq!(reason, Some(IneligibleReason::Deselected));
    }

    #[test]
    fn test_unresolved_location() {
        let (eligible, reason) = commit_eligibility(NodeType::Location, true, Some(false));
        assert!(!eligible);
        assert_eq!(reason, Some(IneligibleReason::Unresolved));
    }

    #[test]
    fn test_resolved_location_eligible() {
        let (eligible, reason) = commit_eligibility(NodeType::Location, true, Some(true));
        assert!(eligible);
        assert_eq!(reason, None);
    }

    #[test]
    fn test_unreviewed_location_eligible() {
        // resolved = None means "not yet processed", not "unresolved"
        let (eligible, _) = commit_eligibility(NodeType::Location, true, None);
        assert!(eligible);
    }

    #[test]
    fn test_non_location_ignores_resolved() {
        let (eligible, _) = commit_eligibility(NodeType::Event, true, Some(false));
        assert!(eligible);
    }
}
