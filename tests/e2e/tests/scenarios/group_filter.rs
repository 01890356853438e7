//! Scenario: operational-group AO filtering — inside the polygon earns
//! the full bonus, the 10 km buffer a reduced one, and a candidate far
//! outside is discarded from GROUP scope with fallback to the base
//! list when that empties the set.

use sitrep_core::resolve::{
    score_location, EffectiveContexts, ResolveConfig, SIG_GROUP_NAME_MATCH, SIG_GROUP_POLYGON,
};
use sitrep_core::GazetteerIndex;
use sitrep_e2e::mocks::GazetteerBuilder;

const AO: &str = r#"{
    "features": [{
        "properties": {"name": "Tsentr"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[37.0, 47.5], [38.5, 47.5], [38.5, 48.5], [37.0, 48.5], [37.0, 47.5]]]
        }
    }]
}"#;

fn gazetteer() -> GazetteerIndex {
    GazetteerBuilder::new()
        // Inside the AO
        .locale("Marinka", 47.940038, 37.502252, Some("Donetsk"), Some("Tsentr"))
        // ~3.7 km east of the AO edge: buffer zone
        .locale("Novoselivka", 48.0, 38.55, Some("Donetsk"), Some("Tsentr"))
        // ~37 km east of the AO edge: beyond the buffer
        .locale("Stepove", 48.0, 39.0, Some("Donetsk"), Some("Tsentr"))
        .region("Donetsk", &["Donetsk", "Donetsk Oblast"], &[])
        .group("Tsentr", &["Tsentr", "Tsentr Group"], &["Donetsk"])
        .polygons(AO)
        .build()
}

fn group_ctx() -> EffectiveContexts {
    EffectiveContexts {
        group: Some("Tsentr Group".to_string()),
        ..Default::default()
    }
}

#[test]
fn inside_polygon_full_bonus() {
    let gaz = gazetteer();
    let cands =
        score_location(&gaz, None, &ResolveConfig::default(), "Marinka", &group_ctx()).unwrap();
    assert_eq!(cands.len(), 1);
    assert_eq!(cands[0].contributions[SIG_GROUP_POLYGON], 0.40);
    assert_eq!(cands[0].contributions[SIG_GROUP_NAME_MATCH], 0.50);
}

#[test]
fn buffer_zone_reduced_bonus() {
    let gaz = gazetteer();
    let cands = score_location(
        &gaz,
        None,
        &ResolveConfig::default(),
        "Novoselivka",
        &group_ctx(),
    )
    .unwrap();
    assert_eq!(cands.len(), 1);
    assert_eq!(cands[0].contributions[SIG_GROUP_POLYGON], 0.10);
}

#[test]
fn beyond_buffer_discard_falls_back_to_base() {
    let gaz = gazetteer();
    let cands =
        score_location(&gaz, None, &ResolveConfig::default(), "Stepove", &group_ctx()).unwrap();

    // The only candidate was discarded from GROUP scope; the base list
    // is retained without group signals
    assert_eq!(cands.len(), 1);
    assert!(!cands[0].contributions.contains_key(SIG_GROUP_POLYGON));
    assert!(!cands[0].contributions.contains_key(SIG_GROUP_NAME_MATCH));
}
