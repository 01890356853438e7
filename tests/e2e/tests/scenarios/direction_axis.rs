//! Scenario: direction-axis scoring — a candidate 3 km perpendicular
//! to the anchor→frontline axis earns the near-band bonus, one 25 km
//! off earns the mild penalty; projections are recorded as
//! diagnostics.

use sitrep_core::resolve::{
    score_location, EffectiveContexts, ResolveConfig, DIAG_DIR_ALONG_KM, DIAG_DIR_CROSS_KM,
    SIG_DIRECTION_AXIS,
};
use sitrep_core::GazetteerIndex;
use sitrep_e2e::mocks::{frontline_meridian, GazetteerBuilder};

// Pokrovsk sits at lat 48.282563; the frontline meridian at lon 37.9
// makes the axis run almost due east.
const POKROVSK: (f64, f64) = (48.282563, 37.175816);

fn gazetteer() -> GazetteerIndex {
    GazetteerBuilder::new()
        .locale("Pokrovsk", POKROVSK.0, POKROVSK.1, Some("Donetsk"), None)
        // ~3 km north of the axis midpoint
        .locale("Blyzke", POKROVSK.0 + 0.02713, 37.5, Some("Donetsk"), None)
        // ~25 km north of the axis midpoint
        .locale("Daleke", POKROVSK.0 + 0.22609, 37.5, Some("Donetsk"), None)
        .region("Donetsk", &["Donetsk", "Donetsk Oblast"], &[])
        .direction("Pokrovsk", &["Pokrovsk"], &[POKROVSK])
        .build()
}

fn direction_ctx() -> EffectiveContexts {
    EffectiveContexts {
        direction: Some("Pokrovsk direction".to_string()),
        ..Default::default()
    }
}

#[test]
fn near_axis_candidate_gets_band_bonus() {
    let gaz = gazetteer();
    let frontline = frontline_meridian(37.9, 47.0, 49.5);

    let cands = score_location(
        &gaz,
        Some(&frontline),
        &ResolveConfig::default(),
        "Blyzke",
        &direction_ctx(),
    )
    .unwrap();

    assert_eq!(cands.len(), 1);
    let cand = &cands[0];
    let cross = cand.diagnostics[DIAG_DIR_CROSS_KM];
    assert!(cross < 5.0, "cross {cross}");
    assert!(cand.diagnostics[DIAG_DIR_ALONG_KM] > 0.0);
    assert_eq!(cand.contributions[SIG_DIRECTION_AXIS], 0.30);
}

#[test]
fn far_off_axis_candidate_gets_penalty() {
    let gaz = gazetteer();
    let frontline = frontline_meridian(37.9, 47.0, 49.5);

    let cands = score_location(
        &gaz,
        Some(&frontline),
        &ResolveConfig::default(),
        "Daleke",
        &direction_ctx(),
    )
    .unwrap();

    assert_eq!(cands.len(), 1);
    let cross = cands[0].diagnostics[DIAG_DIR_CROSS_KM];
    assert!(cross >= 20.0, "cross {cross}");
    assert_eq!(cands[0].contributions[SIG_DIRECTION_AXIS], -0.05);
}
