//! LSS Run Pipeline
//!
//! Per-post execution: accept annotator matches, scope events
//! structurally, section the body, enforce the context lattice, and
//! persist everything under one run row. A run that fails mid-way stays
//! visible with `completed_at IS NULL` and is superseded by the next
//! run; re-running is safe.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;

use crate::annotate::{AnnotatedDoc, AnnotatorMatch, EntityLabel};
use crate::lss::contextualize::contextualize;
use crate::lss::scoping::{scope_event, EventScoping};
use crate::lss::sectioning::split_into_sections;
use crate::lss::types::{CtxKind, CtxScope, EventMatch, HintSource, LssContextHint, ScopedEvent};
use crate::storage::{LssEventWrite, LssWrite, StorageError, Store};

/// LSS error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LssError {
    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// LSS result type
pub type Result<T> = std::result::Result<T, LssError>;

/// Knobs for one LSS execution.
#[derive(Debug, Clone)]
pub struct LssConfig {
    /// Annotator engine name recorded on the run
    pub engine: String,
    /// Annotator engine version recorded on the run
    pub engine_version: Option<String>,
    /// Event-match similarity cutoff
    pub min_similarity: f64,
    /// Re-run posts that already have a completed run
    pub reprocess: bool,
}

impl Default for LssConfig {
    fn default() -> Self {
        Self {
            engine: "annotator".to_string(),
            engine_version: None,
            min_similarity: 0.0,
            reprocess: false,
        }
    }
}

/// Counts reported after a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LssRunSummary {
    pub lss_run_id: i64,
    pub sections: usize,
    pub events_kept: usize,
    pub events_dropped: usize,
    pub roles: usize,
    pub series: usize,
    pub items: usize,
    pub hints: usize,
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LssOutcome {
    /// Post already has a completed run and reprocessing was not requested
    Skipped,
    Completed(LssRunSummary),
}

/// Run LSS over one post's annotated document and matches.
pub fn run_lss(
    store: &Store,
    config: &LssConfig,
    ingest_post_id: i64,
    doc: &AnnotatedDoc,
    matches: &[AnnotatorMatch],
) -> Result<LssOutcome> {
    // Incremental execution guard
    if !config.reprocess && store.has_completed_run(ingest_post_id)? {
        tracing::debug!(ingest_post_id, "completed run exists; skipping");
        return Ok(LssOutcome::Skipped);
    }

    let lss_run_id = store.create_lss_run(
        ingest_post_id,
        &config.engine,
        config.engine_version.as_deref(),
        Utc::now(),
    )?;

    // --------------------------------------------------------------
    // Accept matches
    // --------------------------------------------------------------

    let mut accepted: Vec<(EventMatch, &AnnotatorMatch)> = Vec::new();
    let mut annotator_hints: Vec<LssContextHint> = Vec::new();
    let mut dropped = 0usize;

    for m in matches {
        if m.is_event() {
            if m.similarity < config.min_similarity {
                dropped += 1;
                continue;
            }
            let Some((start, end)) = match_doc_span(m) else {
                tracing::warn!(label = %m.label, "event match has no aligned tokens; dropped");
                dropped += 1;
                continue;
            };

            let text = m
                .sentence_text
                .clone()
                .unwrap_or_else(|| doc.span_text(start, end).to_string());

            accepted.push((
                EventMatch {
                    event_uid: format!("{ingest_post_id}:{}", accepted.len()),
                    label: m.label.clone(),
                    search_phrase: m.label.trim_start_matches("EVENT:").to_string(),
                    text,
                    similarity: m.similarity,
                    negated: m.negated,
                    uncertain: m.uncertain,
                    involves_coreference: m.involves_coreference,
                    start_token: start,
                    end_token: end,
                },
                m,
            ));
        } else if m.is_context() {
            annotator_hints.push(annotator_hint(doc, m));
        }
    }

    // --------------------------------------------------------------
    // Structural scoping + validity filter
    // --------------------------------------------------------------

    let mut kept: Vec<ScopedEvent> = Vec::new();
    let mut attached_entities: HashSet<usize> = HashSet::new();

    for (event, raw) in accepted {
        let EventScoping {
            roles,
            series,
            mut hints,
            attached_entities: attached,
        } = scope_event(doc, &event, kept.len(), &raw.word_matches);

        if roles.is_empty() || series.is_empty() {
            tracing::debug!(event = %event.event_uid, "event dropped: no roles or no location series");
            dropped += 1;
            continue;
        }

        // Re-anchor EVENT-scoped hints on the post-filter ordinal
        let ordinal = kept.len();
        for hint in &mut hints {
            if hint.scope == CtxScope::Event {
                hint.target_id = Some(ordinal);
            }
        }

        attached_entities.extend(attached);
        kept.push(ScopedEvent {
            event,
            roles,
            series,
            hints,
        });
    }

    // --------------------------------------------------------------
    // Sections; assign kept events by character offset
    // --------------------------------------------------------------

    let sections = split_into_sections(doc.text());

    let section_of = |token: usize| -> Option<usize> {
        let offset = doc.tokens().get(token)?.start_char;
        sections
            .iter()
            .find(|s| offset >= s.start_char && offset < s.end_char)
            .map(|s| s.ordinal)
    };

    let event_sections: Vec<Option<usize>> = kept
        .iter()
        .map(|ev| section_of(ev.event.start_token))
        .collect();

    // --------------------------------------------------------------
    // Run-level hints: unattached entities, annotator hints, lattice
    // --------------------------------------------------------------

    let mut run_hints: Vec<LssContextHint> = Vec::new();
    let mut seen: HashSet<(String, String, CtxScope, Option<usize>)> = HashSet::new();

    for (idx, ent) in doc.entities().iter().enumerate() {
        let ctx_kind = match ent.label {
            EntityLabel::Region => CtxKind::Region,
            EntityLabel::Group => CtxKind::Group,
            EntityLabel::Direction => CtxKind::Direction,
            EntityLabel::Location => continue,
        };
        if attached_entities.contains(&idx) {
            continue;
        }

        let (scope, target_id) = match section_of(ent.start_token) {
            Some(ordinal) => (CtxScope::Section, Some(ordinal)),
            None => (CtxScope::Post, None),
        };
        if seen.insert((
            ctx_kind.as_str().to_string(),
            ent.text.clone(),
            scope,
            target_id,
        )) {
            run_hints.push(LssContextHint {
                ctx_kind,
                text: ent.text.clone(),
                start_token: Some(ent.start_token),
                end_token: Some(ent.end_token),
                scope,
                target_id,
                source: HintSource::Gazetteer,
            });
        }
    }

    // Annotator hints scope to the section containing them, else POST
    for mut hint in annotator_hints {
        if let Some(ordinal) = hint.start_token.and_then(section_of) {
            hint.scope = CtxScope::Section;
            hint.target_id = Some(ordinal);
        }
        run_hints.push(hint);
    }

    // Mandatory lattice: POST, SECTION-of-event, EVENT-of-event
    let section_ordinals: Vec<usize> = event_sections
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let event_ordinals: Vec<usize> = (0..kept.len()).collect();
    let event_hint_count: usize = kept.iter().map(|ev| ev.hints.len()).sum();

    let all_event_hints: Vec<LssContextHint> = kept
        .iter()
        .flat_map(|ev| ev.hints.iter().cloned())
        .chain(run_hints.iter().cloned())
        .collect();
    run_hints = contextualize(all_event_hints, &section_ordinals, &event_ordinals)
        .into_iter()
        // Event-owned hints persist with their event; keep the rest
        .filter(|h| !matches!(h.scope, CtxScope::Location | CtxScope::Series))
        .filter(|h| h.scope != CtxScope::Event || h.source == HintSource::Synthetic)
        .collect();

    // --------------------------------------------------------------
    // Persist and complete
    // --------------------------------------------------------------

    let event_writes: Vec<LssEventWrite<'_>> = kept
        .iter()
        .zip(&event_sections)
        .map(|(scoped, section_ordinal)| LssEventWrite {
            scoped,
            section_ordinal: *section_ordinal,
        })
        .collect();

    store.persist_lss(
        lss_run_id,
        ingest_post_id,
        &LssWrite {
            sections: &sections,
            events: &event_writes,
            run_hints: &run_hints,
        },
    )?;
    store.complete_lss_run(lss_run_id, Utc::now())?;

    let summary = LssRunSummary {
        lss_run_id,
        sections: sections.len(),
        events_kept: kept.len(),
        events_dropped: dropped,
        roles: kept.iter().map(|ev| ev.roles.len()).sum(),
        series: kept.iter().map(|ev| ev.series.len()).sum(),
        items: kept
            .iter()
            .flat_map(|ev| ev.series.iter())
            .map(|s| s.items.len())
            .sum(),
        hints: event_hint_count + run_hints.len(),
    };

    tracing::info!(
        ingest_post_id,
        lss_run_id,
        events_kept = summary.events_kept,
        events_dropped = summary.events_dropped,
        "LSS run completed"
    );

    Ok(LssOutcome::Completed(summary))
}

/// Document token span of a match: the union of its aligned words.
fn match_doc_span(m: &AnnotatorMatch) -> Option<(usize, usize)> {
    let mut start = usize::MAX;
    let mut end = 0usize;
    for wm in &m.word_matches {
        let Some(idx) = wm.document_token_index else {
            continue;
        };
        start = start.min(idx);
        end = end.max(idx + wm.document_token_length.max(1));
    }
    (start < end).then_some((start, end))
}

/// Construct a context hint from an annotator `CONTEXT:*` match.
/// Scope defaults to POST; the pipeline refines to SECTION by span.
fn annotator_hint(doc: &AnnotatedDoc, m: &AnnotatorMatch) -> LssContextHint {
    let span = match_doc_span(m);
    let text = match span {
        Some((start, end)) => doc.span_text(start, end).to_string(),
        None => String::new(),
    };

    LssContextHint {
        ctx_kind: CtxKind::parse(m.context_kind_label().unwrap_or_default()),
        text,
        start_token: span.map(|s| s.0),
        end_token: span.map(|s| s.1),
        scope: CtxScope::Post,
        target_id: None,
        source: HintSource::Annotator,
    }
}
