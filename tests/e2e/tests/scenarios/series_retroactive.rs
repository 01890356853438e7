//! Scenario: a three-item series followed by a region qualifier — the
//! retroactive rule attaches the qualifier LOCATION-scoped to every
//! item of the series and nothing wider.

use sitrep_core::{run_lss, CtxKind, CtxScope, EntityLabel, LssConfig, LssOutcome};
use sitrep_e2e::harness::TestStore;
use sitrep_e2e::mocks::{event_match, DocBuilder};

#[test]
fn retroactive_qualifier_covers_whole_series() {
    let ts = TestStore::new();

    let text = "shelling near Kurakhove, Heorhiivka and Krasnohorivka in Donetsk Oblast.";
    let doc = DocBuilder::new(text)
        .entity(EntityLabel::Location, "Kurakhove")
        .entity(EntityLabel::Location, "Heorhiivka")
        .entity(EntityLabel::Location, "Krasnohorivka")
        .entity(EntityLabel::Region, "Donetsk Oblast")
        .build();
    let matches = vec![event_match(&doc, "shelling", &[("verb", "shelling")])];

    let post_id = ts.ingest_post(text);
    let outcome = run_lss(&ts.store, &LssConfig::default(), post_id, &doc, &matches).unwrap();
    let LssOutcome::Completed(summary) = outcome else {
        panic!("expected completed run");
    };

    assert_eq!(summary.events_kept, 1);
    assert_eq!(summary.series, 1);
    assert_eq!(summary.items, 3);

    let run_id = summary.lss_run_id;
    let items = ts.store.list_location_items(run_id).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].text, "Kurakhove");
    assert_eq!(items[2].text, "Krasnohorivka");

    // Items strictly increasing in token start
    assert!(items.windows(2).all(|p| p[0].start_token < p[1].start_token));

    // One LOCATION-scoped region hint per item, no wider-scoped copy
    let hints = ts.store.list_context_hints(run_id).unwrap();
    let region_hints: Vec<_> = hints
        .iter()
        .filter(|h| h.ctx_kind == CtxKind::Region)
        .collect();
    assert_eq!(region_hints.len(), 3);
    assert!(region_hints.iter().all(|h| h.scope == CtxScope::Location));

    let targets: Vec<i64> = region_hints.iter().filter_map(|h| h.target_id).collect();
    let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    assert_eq!(targets, item_ids);
}
