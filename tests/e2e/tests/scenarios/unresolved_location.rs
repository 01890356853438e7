//! Scenario: two candidates tie on the full region score — the
//! LOCATION stays unresolved, commit eligibility reports UNRESOLVED,
//! and both candidates remain persisted for review.

use sitrep_core::{EntityLabel, NodeType, Pipeline};
use sitrep_e2e::harness::TestStore;
use sitrep_e2e::mocks::{event_match, DocBuilder, GazetteerBuilder};

#[test]
fn tied_candidates_leave_location_unresolved() {
    let ts = TestStore::new();
    // Two settlements share the name and the region: a guaranteed tie
    let gaz = GazetteerBuilder::new()
        .locale("Dovhenke", 48.94, 37.32, Some("Donetsk"), None)
        .locale("Dovhenke", 48.30, 37.90, Some("Donetsk"), None)
        .region("Donetsk", &["Donetsk", "Donetsk Oblast"], &[])
        .build();

    let text = "Enemy shelled Dovhenke in Donetsk Oblast.";
    let doc = DocBuilder::new(text)
        .entity(EntityLabel::Location, "Dovhenke")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(
        &doc,
        "shelling",
        &[("subject", "Enemy"), ("verb", "shelled")],
    )];

    let post_id = ts.ingest_post(text);
    let report = Pipeline::new(&ts.store, &gaz, None)
        .process_post(post_id, &doc, &matches)
        .unwrap()
        .expect("post processed");

    assert_eq!(report.resolve.locations, 1);
    assert_eq!(report.resolve.resolved, 0);

    let snapshot = report.processed_snapshot_id;
    let nodes = ts.store.load_nodes(report.dom_post_id).unwrap();
    let location_node = nodes
        .iter()
        .find(|n| n.node_type == NodeType::Location)
        .unwrap();

    // Unresolved, no selection source
    let state = ts.store.node_state(snapshot, location_node.id).unwrap();
    assert_eq!(state.resolved, Some(false));
    assert_eq!(state.resolution_source, None);

    // Both candidates persisted at equal score
    let candidates = ts
        .store
        .candidates_for_node(snapshot, location_node.id)
        .unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].total_score, candidates[1].total_score);

    // Ineligible with reason UNRESOLVED
    let eligibility = ts.store.list_commit_eligibility(snapshot).unwrap();
    let row = eligibility
        .iter()
        .find(|e| e.dom_node_id == location_node.id)
        .unwrap();
    assert!(!row.eligible);
    assert_eq!(row.reason.as_deref(), Some("UNRESOLVED"));

    // The rest of the tree still commits
    assert!(eligibility
        .iter()
        .filter(|e| e.dom_node_id != location_node.id)
        .all(|e| e.eligible));
}
