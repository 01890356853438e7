//! Scenario: snapshot advance round-trip — advancing clones every
//! snapshot-scoped row, the prior snapshot stays queryable, stages form
//! a strictly increasing chain, and AUDIT is terminal.

use chrono::Utc;
use sitrep_core::{
    materialize_contexts, run_lss, EntityLabel, LifecycleStage, LssConfig, LssOutcome,
    StorageError,
};
use sitrep_e2e::harness::TestStore;
use sitrep_e2e::mocks::{event_match, DocBuilder};

fn seeded_snapshot(ts: &TestStore) -> (i64, i64) {
    let text = "Russian forces shelled Avdiivka in Donetsk Oblast.";
    let doc = DocBuilder::new(text)
        .entity(EntityLabel::Location, "Avdiivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(&doc, "shelling", &[("verb", "shelled")])];

    let post_id = ts.ingest_post(text);
    let LssOutcome::Completed(summary) =
        run_lss(&ts.store, &LssConfig::default(), post_id, &doc, &matches).unwrap()
    else {
        panic!("expected completed run");
    };

    let ingest = ts
        .store
        .dom_ingest(post_id, summary.lss_run_id, Utc::now())
        .unwrap();
    materialize_contexts(&ts.store, ingest.snapshot_id).unwrap();
    (ingest.dom_post_id, ingest.snapshot_id)
}

#[test]
fn advance_clones_all_snapshot_scoped_rows() {
    let ts = TestStore::new();
    let (dom_post_id, created) = seeded_snapshot(&ts);

    let before = ts.store.snapshot_row_counts(created).unwrap();
    assert!(before.node_states > 0);
    assert!(before.contexts > 0);

    let review = ts.store.advance_snapshot(created, Utc::now()).unwrap();
    let after = ts.store.snapshot_row_counts(review).unwrap();
    assert_eq!(before, after);

    // Cloned states are identical in content
    let old_states = ts.store.list_node_states(created).unwrap();
    let new_states = ts.store.list_node_states(review).unwrap();
    assert_eq!(old_states.len(), new_states.len());
    for (old, new) in old_states.iter().zip(&new_states) {
        assert_eq!(old.dom_node_id, new.dom_node_id);
        assert_eq!(old.selected, new.selected);
        assert_eq!(old.summary, new.summary);
        assert_eq!(old.resolved, new.resolved);
    }

    // Prior snapshot remains queryable and pinned to CREATED
    let prior = ts.store.get_snapshot(created).unwrap();
    assert_eq!(prior.stage, LifecycleStage::Created);
    assert_eq!(prior.dom_post_id, dom_post_id);
}

#[test]
fn mutation_after_advance_leaves_prior_frozen() {
    let ts = TestStore::new();
    let (_, created) = seeded_snapshot(&ts);
    let review = ts.store.advance_snapshot(created, Utc::now()).unwrap();

    let node_id = ts.store.list_node_states(review).unwrap()[0].dom_node_id;
    ts.store.set_selected(review, node_id, false).unwrap();

    assert!(!ts.store.node_state(review, node_id).unwrap().selected);
    assert!(ts.store.node_state(created, node_id).unwrap().selected);
}

#[test]
fn lifecycle_chain_is_strictly_increasing_and_terminal() {
    let ts = TestStore::new();
    let (dom_post_id, created) = seeded_snapshot(&ts);

    let mut current = created;
    for _ in 0..4 {
        current = ts.store.advance_snapshot(current, Utc::now()).unwrap();
    }

    let snapshots = ts.store.snapshots_for_post(dom_post_id).unwrap();
    assert_eq!(snapshots.len(), 5);
    let stages: Vec<LifecycleStage> = snapshots.iter().map(|s| s.stage).collect();
    assert_eq!(
        stages,
        vec![
            LifecycleStage::Created,
            LifecycleStage::InitialReview,
            LifecycleStage::Processed,
            LifecycleStage::FinalReview,
            LifecycleStage::Audit,
        ]
    );

    // AUDIT is terminal
    let result = ts.store.advance_snapshot(current, Utc::now());
    assert!(matches!(result, Err(StorageError::TerminalStage { .. })));
}
