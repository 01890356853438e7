//! Structural Event Scoping
//!
//! Converts one accepted event match plus the entity layer into the
//! canonical structural form: role candidates, location series, and
//! context hints scoped at the tightest defensible level. Everything
//! here is confined to the event's sentence window; SECTION/POST
//! attachment for unclaimed entities happens at the run level.

use std::collections::HashSet;

use crate::annotate::{AnnotatedDoc, EntityLabel, WordMatch};
use crate::lss::types::{
    CtxKind, CtxScope, EventMatch, HintSource, LssContextHint, LssLocationItem,
    LssLocationSeries, LssRoleCandidate, RoleKind,
};

/// Tokens that may separate members of one syntactic location series.
pub const SERIES_JOIN_TOKENS: [&str; 4] = [",", "and", "or", "&"];

/// Result of scoping one event.
pub struct EventScoping {
    pub roles: Vec<LssRoleCandidate>,
    pub series: Vec<LssLocationSeries>,
    /// LOCATION/SERIES/EVENT-scoped hints produced inside the window
    pub hints: Vec<LssContextHint>,
    /// Indices into `doc.entities()` that found an attachment here
    pub attached_entities: HashSet<usize>,
}

fn spans_overlap(a1: usize, a2: usize, b1: usize, b2: usize) -> bool {
    !(a2 <= b1 || b2 <= a1)
}

fn ctx_kind_for(label: EntityLabel) -> Option<CtxKind> {
    match label {
        EntityLabel::Region => Some(CtxKind::Region),
        EntityLabel::Group => Some(CtxKind::Group),
        EntityLabel::Direction => Some(CtxKind::Direction),
        EntityLabel::Location => None,
    }
}

/// Perform structural scoping for a single event.
pub fn scope_event(
    doc: &AnnotatedDoc,
    event: &EventMatch,
    event_ordinal: usize,
    word_matches: &[WordMatch],
) -> EventScoping {
    // Event window: the sentence containing the start token
    let (event_start, event_end) = doc
        .sentence_containing(event.start_token)
        .unwrap_or((event.start_token, event.end_token));

    // --------------------------------------------------------------
    // Role candidates
    // --------------------------------------------------------------

    let mut roles = Vec::new();
    for wm in word_matches {
        let Some(role_kind) = RoleKind::from_match_type(&wm.match_type) else {
            continue;
        };
        let Some(start) = wm.document_token_index else {
            continue;
        };

        roles.push(LssRoleCandidate {
            role_kind,
            document_word: wm.word.clone(),
            text: wm.phrase.clone().unwrap_or_else(|| wm.word.clone()),
            start_token: start,
            end_token: start + wm.document_token_length.max(1),
            match_type: wm.match_type.clone(),
            negated: wm.negated,
            uncertain: wm.uncertain,
            involves_coreference: wm.involves_coreference,
            similarity: wm.similarity,
            explanation: wm.explanation.clone(),
        });
    }

    // --------------------------------------------------------------
    // Location series (event-local)
    // --------------------------------------------------------------

    let mut loc_ents: Vec<&crate::annotate::EntitySpan> = doc
        .entities()
        .iter()
        .filter(|e| {
            e.label == EntityLabel::Location
                && spans_overlap(e.start_token, e.end_token, event_start, event_end)
        })
        .collect();
    loc_ents.sort_by_key(|e| e.start_token);

    let mut series: Vec<LssLocationSeries> = Vec::new();
    let mut current: Vec<LssLocationItem> = Vec::new();
    let mut series_id = 0usize;
    let mut item_id = 0usize;

    let flush =
        |current: &mut Vec<LssLocationItem>, series: &mut Vec<LssLocationSeries>, sid: &mut usize| {
            if current.is_empty() {
                return;
            }
            let items = std::mem::take(current);
            series.push(LssLocationSeries {
                series_id: *sid,
                start_token: items[0].start_token,
                end_token: items[items.len() - 1].end_token,
                items,
            });
            *sid += 1;
        };

    for ent in &loc_ents {
        let item = LssLocationItem {
            item_id,
            text: ent.text.clone(),
            start_token: ent.start_token,
            end_token: ent.end_token,
        };
        item_id += 1;

        if let Some(prev) = current.last() {
            if is_series_joined(doc, prev.end_token, item.start_token) {
                current.push(item);
            } else {
                flush(&mut current, &mut series, &mut series_id);
                current.push(item);
            }
        } else {
            current.push(item);
        }
    }
    flush(&mut current, &mut series, &mut series_id);

    // --------------------------------------------------------------
    // Context hints (gazetteer entity layer)
    // --------------------------------------------------------------

    let mut hints: Vec<LssContextHint> = Vec::new();
    let mut attached_entities = HashSet::new();

    for (ent_idx, ent) in doc.entities().iter().enumerate() {
        let Some(ctx_kind) = ctx_kind_for(ent.label) else {
            continue;
        };
        if !spans_overlap(ent.start_token, ent.end_token, event_start, event_end) {
            continue;
        }

        let mut attached = false;

        // LOCATION (contained-in-item)
        for s in &series {
            for item in &s.items {
                if ent.start_token >= item.start_token && ent.end_token <= item.end_token {
                    hints.push(LssContextHint {
                        ctx_kind: ctx_kind.clone(),
                        text: ent.text.clone(),
                        start_token: Some(ent.start_token),
                        end_token: Some(ent.end_token),
                        scope: CtxScope::Location,
                        target_id: Some(item.item_id),
                        source: HintSource::Gazetteer,
                    });
                    attached = true;
                }
            }
        }
        if attached {
            attached_entities.insert(ent_idx);
            continue;
        }

        // LOCATION (retroactive series qualifier)
        if apply_retroactive_series_qualifier(doc, &series, ent, &ctx_kind, &mut hints) {
            attached_entities.insert(ent_idx);
            continue;
        }

        // SERIES (overlap)
        for s in &series {
            if spans_overlap(ent.start_token, ent.end_token, s.start_token, s.end_token) {
                hints.push(LssContextHint {
                    ctx_kind: ctx_kind.clone(),
                    text: ent.text.clone(),
                    start_token: Some(ent.start_token),
                    end_token: Some(ent.end_token),
                    scope: CtxScope::Series,
                    target_id: Some(s.series_id),
                    source: HintSource::Gazetteer,
                });
                attached = true;
            }
        }
        if attached {
            attached_entities.insert(ent_idx);
            continue;
        }

        // EVENT (overlap with the window, established above)
        hints.push(LssContextHint {
            ctx_kind,
            text: ent.text.clone(),
            start_token: Some(ent.start_token),
            end_token: Some(ent.end_token),
            scope: CtxScope::Event,
            target_id: Some(event_ordinal),
            source: HintSource::Gazetteer,
        });
        attached_entities.insert(ent_idx);
    }

    EventScoping {
        roles,
        series,
        hints,
        attached_entities,
    }
}

/// A gap joins a series when it is non-empty and every non-whitespace
/// token in it is a series joiner.
fn is_series_joined(doc: &AnnotatedDoc, gap_start: usize, gap_end: usize) -> bool {
    if gap_start >= gap_end {
        return false;
    }
    let mut saw_token = false;
    for tok in doc.gap_tokens(gap_start, gap_end) {
        let t = tok.trim();
        if t.is_empty() {
            continue;
        }
        saw_token = true;
        if !SERIES_JOIN_TOKENS.contains(&t.to_lowercase().as_str()) {
            return false;
        }
    }
    saw_token
}

/// Retroactive REGION/GROUP/DIRECTION qualifiers partition a location
/// series: each applies to the suffix of the series owning the item the
/// qualifier immediately follows, cut off at the previous qualifier of
/// the same kind. Aborts when an interloping LOCATION entity outside
/// that series sits between the item and the qualifier.
fn apply_retroactive_series_qualifier(
    doc: &AnnotatedDoc,
    series: &[LssLocationSeries],
    ent: &crate::annotate::EntitySpan,
    ctx_kind: &CtxKind,
    hints: &mut Vec<LssContextHint>,
) -> bool {
    // The latest item ending before the qualifier, and its series
    let mut owner: Option<(&LssLocationSeries, &LssLocationItem)> = None;
    for s in series {
        for item in &s.items {
            if item.end_token <= ent.start_token
                && owner.is_none_or(|(_, best)| item.start_token > best.start_token)
            {
                owner = Some((s, item));
            }
        }
    }
    let Some((s, last_item_before)) = owner else {
        return false;
    };

    let series_starts: HashSet<usize> = s.items.iter().map(|it| it.start_token).collect();
    for other in doc.entities() {
        if other.label != EntityLabel::Location {
            continue;
        }
        if other.start_token >= last_item_before.end_token
            && other.start_token < ent.start_token
            && !series_starts.contains(&other.start_token)
        {
            return false;
        }
    }

    // Cutoff: the most recent prior same-kind qualifier on this series
    let mut cutoff = s.start_token;
    for hint in hints.iter() {
        if hint.ctx_kind == *ctx_kind
            && hint.scope == CtxScope::Location
            && hint
                .start_token
                .is_some_and(|start| start < ent.start_token)
            && hint
                .target_id
                .is_some_and(|tid| s.items.iter().any(|it| it.item_id == tid))
        {
            if let Some(start) = hint.start_token {
                cutoff = cutoff.max(start);
            }
        }
    }

    for item in &s.items {
        if item.start_token >= cutoff && item.end_token <= ent.start_token {
            hints.push(LssContextHint {
                ctx_kind: ctx_kind.clone(),
                text: ent.text.clone(),
                start_token: Some(ent.start_token),
                end_token: Some(ent.end_token),
                scope: CtxScope::Location,
                target_id: Some(item.item_id),
                source: HintSource::Gazetteer,
            });
        }
    }

    true
}
