//! Per-Post Pipeline Driver
//!
//! Sequential, deterministic orchestration of one post through the
//! automated stages: LSS run → DOM ingest at CREATED → context
//! materialization → advance to PROCESSED → candidate resolution →
//! commit eligibility. Review stages beyond PROCESSED advance under
//! human control. Posts may be processed in parallel at the driver
//! level; within a post every stage is sequential.

use chrono::Utc;

use crate::annotate::{AnnotatedDoc, AnnotatorMatch};
use crate::dom::{materialize_contexts, recompute_commit_eligibility, DomError};
use crate::gazetteer::GazetteerIndex;
use crate::lss::{run_lss, LssConfig, LssError, LssOutcome, LssRunSummary};
use crate::resolve::{resolve_snapshot, ResolveConfig, ResolveError, ResolveSummary};
use crate::spatial::Frontline;
use crate::storage::{StorageError, Store};

/// Pipeline error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lss(#[from] LssError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Pipeline result type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// What happened to one post.
#[derive(Debug, Clone)]
pub struct PostReport {
    pub ingest_post_id: i64,
    pub lss: LssRunSummary,
    pub dom_post_id: i64,
    /// The PROCESSED snapshot resolution ran against
    pub processed_snapshot_id: i64,
    pub resolve: ResolveSummary,
}

/// Deterministic, phase-ordered post processor.
///
/// The gazetteer and frontline are read-only after load; one pipeline
/// may be shared across workers processing different posts.
pub struct Pipeline<'a> {
    store: &'a Store,
    gazetteer: &'a GazetteerIndex,
    frontline: Option<&'a Frontline>,
    lss_config: LssConfig,
    resolve_config: ResolveConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        store: &'a Store,
        gazetteer: &'a GazetteerIndex,
        frontline: Option<&'a Frontline>,
    ) -> Self {
        Self {
            store,
            gazetteer,
            frontline,
            lss_config: LssConfig::default(),
            resolve_config: ResolveConfig::default(),
        }
    }

    pub fn with_lss_config(mut self, config: LssConfig) -> Self {
        self.lss_config = config;
        self
    }

    pub fn with_resolve_config(mut self, config: ResolveConfig) -> Self {
        self.resolve_config = config;
        self
    }

    /// Run one post through LSS, DOM ingest, context materialization,
    /// advance to PROCESSED, resolution, and eligibility recompute.
    ///
    /// Returns `None` when the post already has a completed run and
    /// reprocessing was not requested.
    pub fn process_post(
        &self,
        ingest_post_id: i64,
        doc: &AnnotatedDoc,
        matches: &[AnnotatorMatch],
    ) -> Result<Option<PostReport>> {
        let lss = match run_lss(self.store, &self.lss_config, ingest_post_id, doc, matches)? {
            LssOutcome::Skipped => return Ok(None),
            LssOutcome::Completed(summary) => summary,
        };

        let ingest = self
            .store
            .dom_ingest(ingest_post_id, lss.lss_run_id, Utc::now())?;

        materialize_contexts(self.store, ingest.snapshot_id)?;

        let initial_review = self.store.advance_snapshot(ingest.snapshot_id, Utc::now())?;
        let processed = self.store.advance_snapshot(initial_review, Utc::now())?;

        let resolve = resolve_snapshot(
            self.store,
            self.gazetteer,
            self.frontline,
            &self.resolve_config,
            processed,
        )?;

        recompute_commit_eligibility(self.store, processed)?;

        Ok(Some(PostReport {
            ingest_post_id,
            lss,
            dom_post_id: ingest.dom_post_id,
            processed_snapshot_id: processed,
            resolve,
        }))
    }
}
