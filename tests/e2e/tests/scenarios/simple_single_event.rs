//! Scenario: a simple single-event post flows end to end — one section,
//! one event, a one-item series, a LOCATION-scoped region hint, a
//! materialized context, and a resolved candidate with full region
//! score.

use sitrep_core::{CtxKind, CtxScope, EntityLabel, HintSource, NodeType, Pipeline};
use sitrep_e2e::harness::TestStore;
use sitrep_e2e::mocks::{donbas_gazetteer, event_match, DocBuilder};

#[test]
fn simple_single_event_post_resolves() {
    let ts = TestStore::new();
    let gaz = donbas_gazetteer();

    let text = "Russian forces shelled Avdiivka in Donetsk Oblast.";
    let doc = DocBuilder::new(text)
        .entity(EntityLabel::Location, "Avdiivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(
        &doc,
        "shelling",
        &[("subject", "Russian forces"), ("verb", "shelled")],
    )];

    let post_id = ts.ingest_post(text);
    let pipeline = Pipeline::new(&ts.store, &gaz, None);
    let report = pipeline
        .process_post(post_id, &doc, &matches)
        .unwrap()
        .expect("post processed");

    // ------------------------------------------------------------
    // LSS structure
    // ------------------------------------------------------------

    assert_eq!(report.lss.sections, 1);
    assert_eq!(report.lss.events_kept, 1);
    assert_eq!(report.lss.events_dropped, 0);
    assert_eq!(report.lss.roles, 2);

    let run_id = report.lss.lss_run_id;
    let sections = ts.store.list_lss_sections(run_id).unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].ordinal, 0);

    let series = ts.store.list_location_series(run_id).unwrap();
    assert_eq!(series.len(), 1);
    let items = ts.store.list_location_items(run_id).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "Avdiivka");

    // The region qualifier lands LOCATION-scoped on the single item
    let hints = ts.store.list_context_hints(run_id).unwrap();
    let region_hints: Vec<_> = hints
        .iter()
        .filter(|h| h.ctx_kind == CtxKind::Region)
        .collect();
    assert_eq!(region_hints.len(), 1);
    assert_eq!(region_hints[0].scope, CtxScope::Location);
    assert_eq!(region_hints[0].target_id, Some(items[0].id));
    assert_eq!(region_hints[0].source, HintSource::Gazetteer);

    // ------------------------------------------------------------
    // DOM tree: POST → SECTION → EVENT → LOCATION_SERIES → LOCATION
    // ------------------------------------------------------------

    let nodes = ts.store.load_nodes(report.dom_post_id).unwrap();
    assert_eq!(nodes.len(), 5);
    let type_chain: Vec<NodeType> = nodes.iter().map(|n| n.node_type).collect();
    assert_eq!(
        type_chain,
        vec![
            NodeType::Post,
            NodeType::Section,
            NodeType::Event,
            NodeType::LocationSeries,
            NodeType::Location,
        ]
    );

    let snapshot = report.processed_snapshot_id;
    let location_node = nodes.last().unwrap();

    // Context materialized at the LOCATION node, contributed there
    let contexts = ts
        .store
        .contexts_for_node(snapshot, location_node.id)
        .unwrap();
    let region_ctx = contexts
        .iter()
        .find(|c| c.ctx_kind == CtxKind::Region)
        .expect("region context at LOCATION node");
    assert_eq!(region_ctx.ctx_value, "Donetsk Oblast");
    assert!(region_ctx.overridden);

    // ------------------------------------------------------------
    // Candidate scoring and resolution
    // ------------------------------------------------------------

    let candidates = ts
        .store
        .candidates_for_node(snapshot, location_node.id)
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].rank, 0);
    assert_eq!(candidates[0].total_score, 1.0);

    let signals: serde_json::Value = serde_json::from_str(&candidates[0].signals_json).unwrap();
    assert_eq!(signals["contributions"]["region_match"], 1.0);

    let state = ts.store.node_state(snapshot, location_node.id).unwrap();
    assert_eq!(state.resolved, Some(true));
    assert_eq!(state.resolution_source.as_deref(), Some("region_match"));

    // Everything commits
    let eligibility = ts.store.list_commit_eligibility(snapshot).unwrap();
    assert_eq!(eligibility.len(), 5);
    assert!(eligibility.iter().all(|e| e.eligible));

    assert_eq!(report.resolve.locations, 1);
    assert_eq!(report.resolve.resolved, 1);
}
