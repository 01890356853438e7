//! Per-Snapshot Resolution Pass
//!
//! Walks every LOCATION_SERIES of a snapshot's post: scores each
//! LOCATION node under its materialized contexts, flags cluster
//! outliers among sibling top candidates, writes the ranked candidate
//! lists back, and records resolution on node state.

use crate::dom::{build_bindings, LifecycleStage};
use crate::gazetteer::GazetteerIndex;
use crate::resolve::contexts::EffectiveContexts;
use crate::resolve::resolution::resolve_candidates;
use crate::resolve::scoring::{score_location, LocaleCandidate};
use crate::resolve::{CandidateSignals, ResolveConfig, Result};
use crate::spatial::{flag_cluster_outliers, Frontline};
use crate::storage::{CandidateRow, Store};

/// Counts reported after a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub locations: usize,
    pub resolved: usize,
    pub candidates_written: usize,
}

/// Score and resolve every LOCATION node of the snapshot's post.
pub fn resolve_snapshot(
    store: &Store,
    gaz: &GazetteerIndex,
    frontline: Option<&Frontline>,
    config: &ResolveConfig,
    snapshot_id: i64,
) -> Result<ResolveSummary> {
    let snapshot = store.get_snapshot(snapshot_id)?;
    if snapshot.stage != LifecycleStage::Processed {
        tracing::warn!(
            snapshot_id,
            stage = snapshot.stage.as_str(),
            "resolution normally runs at PROCESSED"
        );
    }

    let bindings = build_bindings(store, snapshot.dom_post_id)?;
    let mut summary = ResolveSummary::default();

    for series_node in bindings.series_node_ids() {
        let location_nodes = bindings.locations_in_series(series_node);

        // Score each sibling first; clustering needs all the tops
        let mut per_node: Vec<(i64, Vec<LocaleCandidate>)> =
            Vec::with_capacity(location_nodes.len());
        for node_id in location_nodes {
            let Some(item) = bindings.item_for_node.get(&node_id) else {
                continue;
            };
            let ctx_rows = store.contexts_for_node(snapshot_id, node_id)?;
            let ctx = EffectiveContexts::from_rows(&ctx_rows);

            let candidates = score_location(gaz, frontline, config, &item.text, &ctx)?;
            per_node.push((node_id, candidates));
        }

        // Cluster check over sibling top candidates; flag, never discard
        let points: Vec<(f64, f64)> = per_node
            .iter()
            .filter_map(|(_, cands)| cands.first().map(|c| (c.locale.lat, c.locale.lon)))
            .collect();
        let flags = flag_cluster_outliers(&points, config.cluster_outlier_margin_km);
        let mut flag_iter = flags.into_iter();
        for (_, cands) in per_node.iter_mut() {
            if let Some(top) = cands.first_mut() {
                if let Some(flag) = flag_iter.next() {
                    top.cluster_outlier = flag;
                }
            }
        }

        // Write back and resolve
        for (node_id, candidates) in per_node {
            let rows: Vec<CandidateRow> = candidates
                .iter()
                .enumerate()
                .map(|(rank, cand)| {
                    Ok(CandidateRow {
                        candidate_key: cand.locale.cid,
                        rank: rank as i64,
                        total_score: cand.total_score(),
                        signals_json: serde_json::to_string(&CandidateSignals {
                            contributions: cand.contributions.clone(),
                            diagnostics: cand.diagnostics.clone(),
                            cluster_outlier: cand.cluster_outlier,
                        })?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            store.write_location_candidates(snapshot_id, node_id, &rows)?;
            summary.candidates_written += rows.len();

            let outcome = resolve_candidates(&candidates, config.resolution_threshold);
            store.set_resolution(
                snapshot_id,
                node_id,
                Some(outcome.resolved),
                outcome.resolution_source.as_deref(),
            )?;

            summary.locations += 1;
            if outcome.resolved {
                summary.resolved += 1;
            }
        }
    }

    tracing::info!(
        snapshot_id,
        locations = summary.locations,
        resolved = summary.resolved,
        "resolution pass completed"
    );

    Ok(summary)
}
