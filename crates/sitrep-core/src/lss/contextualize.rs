//! Mandatory Context Lattice
//!
//! After real hints are collected, every post must carry context of
//! some kind at POST scope, at each event's SECTION scope, and at each
//! EVENT scope. Missing levels are synthesized explicitly with empty
//! text so their absence is visible rather than ambiguous. SERIES- and
//! LOCATION-scoped contexts are never synthesized; their absence is
//! meaningful.

use crate::lss::types::{CtxKind, CtxScope, HintSource, LssContextHint};

fn synthetic(scope: CtxScope, target_id: Option<usize>) -> LssContextHint {
    LssContextHint {
        ctx_kind: CtxKind::Marker,
        text: String::new(),
        start_token: None,
        end_token: None,
        scope,
        target_id,
        source: HintSource::Synthetic,
    }
}

/// Enforce the mandatory context lattice.
///
/// `section_ordinals` lists the sections that contain at least one kept
/// event; `event_ordinals` lists the kept events. Child context
/// overrides parent downstream; no semantic resolution happens here.
pub fn contextualize(
    hints: Vec<LssContextHint>,
    section_ordinals: &[usize],
    event_ordinals: &[usize],
) -> Vec<LssContextHint> {
    let mut out: Vec<LssContextHint> = Vec::with_capacity(hints.len() + 4);

    if !hints.iter().any(|h| h.scope == CtxScope::Post) {
        out.push(synthetic(CtxScope::Post, None));
    }

    for &sec in section_ordinals {
        if !hints
            .iter()
            .any(|h| h.scope == CtxScope::Section && h.target_id == Some(sec))
        {
            out.push(synthetic(CtxScope::Section, Some(sec)));
        }
    }

    for &ev in event_ordinals {
        if !hints
            .iter()
            .any(|h| h.scope == CtxScope::Event && h.target_id == Some(ev))
        {
            out.push(synthetic(CtxScope::Event, Some(ev)));
        }
    }

    out.extend(hints);
    out
}
