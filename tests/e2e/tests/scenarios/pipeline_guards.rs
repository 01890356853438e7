//! Idempotence and precondition guards: completed runs skip, DOM
//! ingest refuses duplicates and incomplete runs, context
//! materialization refuses to run twice, and the context lattice is
//! complete at POST/SECTION/EVENT for every kept event.

use chrono::Utc;
use sitrep_core::{
    materialize_contexts, run_lss, CtxScope, EntityLabel, LssConfig, LssOutcome,
    MaterializeOutcome, Pipeline, StorageError,
};
use sitrep_e2e::harness::TestStore;
use sitrep_e2e::mocks::{donbas_gazetteer, event_match, DocBuilder};

fn fixture() -> (String, Vec<(&'static str, &'static str)>) {
    (
        "Russian forces shelled Avdiivka in Donetsk Oblast.".to_string(),
        vec![("subject", "Russian forces"), ("verb", "shelled")],
    )
}

#[test]
fn completed_run_skips_reprocessing() {
    let ts = TestStore::new();
    let gaz = donbas_gazetteer();
    let (text, words) = fixture();
    let doc = DocBuilder::new(&text)
        .entity(EntityLabel::Location, "Avdiivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(&doc, "shelling", &words)];
    let post_id = ts.ingest_post(&text);

    let pipeline = Pipeline::new(&ts.store, &gaz, None);
    assert!(pipeline.process_post(post_id, &doc, &matches).unwrap().is_some());
    // Second invocation skips on the completed-run guard
    assert!(pipeline.process_post(post_id, &doc, &matches).unwrap().is_none());
}

#[test]
fn dom_ingest_refuses_duplicates_and_incomplete_runs() {
    let ts = TestStore::new();
    let (text, words) = fixture();
    let doc = DocBuilder::new(&text)
        .entity(EntityLabel::Location, "Avdiivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(&doc, "shelling", &words)];
    let post_id = ts.ingest_post(&text);

    let LssOutcome::Completed(summary) =
        run_lss(&ts.store, &LssConfig::default(), post_id, &doc, &matches).unwrap()
    else {
        panic!("expected completed run");
    };

    ts.store
        .dom_ingest(post_id, summary.lss_run_id, Utc::now())
        .unwrap();

    // Re-ingest for the same pair fails
    let dup = ts.store.dom_ingest(post_id, summary.lss_run_id, Utc::now());
    assert!(matches!(dup, Err(StorageError::AlreadyIngested { .. })));

    // An incomplete run cannot back a DOM
    let incomplete = ts
        .store
        .create_lss_run(post_id, "annotator", None, Utc::now())
        .unwrap();
    let result = ts.store.dom_ingest(post_id, incomplete, Utc::now());
    assert!(matches!(result, Err(StorageError::RunIncomplete(_))));

    // Unknown runs are reported as such
    let missing = ts.store.dom_ingest(post_id, 99_999, Utc::now());
    assert!(matches!(missing, Err(StorageError::RunNotFound(_))));
}

#[test]
fn materialization_refuses_to_run_twice() {
    let ts = TestStore::new();
    let (text, words) = fixture();
    let doc = DocBuilder::new(&text)
        .entity(EntityLabel::Location, "Avdiivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(&doc, "shelling", &words)];
    let post_id = ts.ingest_post(&text);

    let LssOutcome::Completed(summary) =
        run_lss(&ts.store, &LssConfig::default(), post_id, &doc, &matches).unwrap()
    else {
        panic!("expected completed run");
    };
    let ingest = ts
        .store
        .dom_ingest(post_id, summary.lss_run_id, Utc::now())
        .unwrap();

    let first = materialize_contexts(&ts.store, ingest.snapshot_id).unwrap();
    assert!(matches!(first, MaterializeOutcome::Written(n) if n > 0));

    let second = materialize_contexts(&ts.store, ingest.snapshot_id).unwrap();
    assert_eq!(second, MaterializeOutcome::AlreadyMaterialized);
}

#[test]
fn lattice_is_complete_at_post_section_event() {
    let ts = TestStore::new();
    let (text, words) = fixture();
    let doc = DocBuilder::new(&text)
        .entity(EntityLabel::Location, "Avdiivka")
        .build();
    let matches = vec![event_match(&doc, "shelling", &words)];
    let post_id = ts.ingest_post(&text);

    let LssOutcome::Completed(summary) =
        run_lss(&ts.store, &LssConfig::default(), post_id, &doc, &matches).unwrap()
    else {
        panic!("expected completed run");
    };

    // No region entity this time: every mandatory level is synthesized
    let hints = ts.store.list_context_hints(summary.lss_run_id).unwrap();
    for scope in [CtxScope::Post, CtxScope::Section, CtxScope::Event] {
        assert!(
            hints.iter().any(|h| h.scope == scope),
            "missing {scope:?} hint"
        );
    }
}
