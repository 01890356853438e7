//! Context Materialization (Dominance Resolution)
//!
//! For each DOM node, walk the chain node → parent → … → POST. The
//! first (tightest) level at which a `ctx_kind` appears wins; all of
//! that level's values for the kind are adopted and deeper ancestors
//! are shadowed. A value contributed by the node itself is marked
//! `overridden`. Sibling values never cross over.
//!
//! Runs exactly once per snapshot; the store guard refuses a second
//! materialization.

use std::collections::{HashMap, HashSet};

use crate::dom::binding::{build_bindings, DomError, NodeBindings, Result};
use crate::lss::{CtxKind, CtxScope, HintSource};
use crate::storage::{DomContextRow, HintRecord, MaterializeOutcome, Store};

/// Materialize dominance-resolved context for every node of the
/// snapshot's post.
pub fn materialize_contexts(store: &Store, snapshot_id: i64) -> Result<MaterializeOutcome> {
    let snapshot = store.get_snapshot(snapshot_id)?;
    let (_, lss_run_id) = store.dom_post_run(snapshot.dom_post_id)?;

    let bindings = build_bindings(store, snapshot.dom_post_id)?;
    let hints = store.list_context_hints(lss_run_id)?;

    let at_node = attach_hints(&bindings, &hints)?;

    let mut rows: Vec<DomContextRow> = Vec::new();
    for node in &bindings.nodes {
        let chain = bindings.chain_to_root(node.id);
        let mut seen_kinds: HashSet<CtxKind> = HashSet::new();

        for (depth, level_node) in chain.iter().enumerate() {
            let Some(level_values) = at_node.get(level_node) else {
                continue;
            };

            // Kinds first seen at this level win for the chain below
            let mut adopted_here: HashSet<CtxKind> = HashSet::new();
            for (kind, value) in level_values {
                if seen_kinds.contains(kind) {
                    continue;
                }
                adopted_here.insert(kind.clone());
                rows.push(DomContextRow {
                    dom_node_id: node.id,
                    ctx_kind: kind.clone(),
                    ctx_value: value.clone(),
                    overridden: depth == 0,
                });
            }
            seen_kinds.extend(adopted_here);
        }
    }

    let outcome = store.materialize_contexts(snapshot_id, &rows)?;
    if let MaterializeOutcome::Written(n) = outcome {
        tracing::info!(snapshot_id, rows = n, "context materialized");
    }
    Ok(outcome)
}

/// Map persisted hints onto the nodes they attach at. Synthetic
/// placeholders and empty-text hints carry no value and are skipped.
fn attach_hints(
    bindings: &NodeBindings,
    hints: &[HintRecord],
) -> Result<HashMap<i64, Vec<(CtxKind, String)>>> {
    let mut at_node: HashMap<i64, Vec<(CtxKind, String)>> = HashMap::new();

    for hint in hints {
        if hint.source == HintSource::Synthetic || hint.text.is_empty() {
            continue;
        }

        let node_id = match hint.scope {
            CtxScope::Post => Some(bindings.post_node),
            CtxScope::Section => lookup(&bindings.section_nodes, hint, "section")?,
            CtxScope::Event => lookup(&bindings.event_nodes, hint, "event")?,
            CtxScope::Series => lookup(&bindings.series_nodes, hint, "series")?,
            CtxScope::Location => lookup(&bindings.item_nodes, hint, "item")?,
        };

        if let Some(node_id) = node_id {
            at_node
                .entry(node_id)
                .or_default()
                .push((hint.ctx_kind.clone(), hint.text.clone()));
        }
    }

    Ok(at_node)
}

fn lookup(
    map: &HashMap<i64, i64>,
    hint: &HintRecord,
    what: &str,
) -> Result<Option<i64>> {
    let Some(target) = hint.target_id else {
        // Scoped hints without a target row cannot attach; treat as a
        // structural defect of the run rather than silently widening
        return Err(DomError::ProvenanceMismatch(format!(
            "{}-scoped hint {} has no target",
            hint.scope.as_str(),
            hint.id
        )));
    };
    match map.get(&target) {
        Some(&node_id) => Ok(Some(node_id)),
        None => Err(DomError::ProvenanceMismatch(format!(
            "hint {} targets unknown {what} row {target}",
            hint.id
        ))),
    }
}
