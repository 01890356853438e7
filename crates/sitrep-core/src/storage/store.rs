//! SQLite Store Implementation
//!
//! Transactional persistence for ingest posts, LSS runs, and the
//! snapshot-versioned DOM. The store is the only module that touches
//! SQL; business logic upstream works against its typed methods.
//!
//! Uses a single connection behind a `Mutex` so `Store` is `Send + Sync`
//! and shareable across per-post workers; every multi-row write runs in
//! one transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::dom::{LifecycleStage, NodeType};
use crate::lss::{
    CtxKind, CtxScope, HintSource, LssContextHint, LssSection, RoleKind, ScopedEvent,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Connection lock poisoned
    #[error("Store lock poisoned")]
    LockPoisoned,
    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// A persisted value failed enum/typed parsing
    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: &'static str, value: String },
    /// Requested LSS run does not exist
    #[error("LSS run {0} does not exist")]
    RunNotFound(i64),
    /// Requested LSS run never completed
    #[error("LSS run {0} is not completed")]
    RunIncomplete(i64),
    /// Run does not belong to the ingest post
    #[error("LSS run {lss_run_id} does not belong to ingest post {ingest_post_id}")]
    RunPostMismatch { lss_run_id: i64, ingest_post_id: i64 },
    /// DOM already ingested for the pair
    #[error("DOM already ingested for (ingest_post_id {ingest_post_id}, lss_run_id {lss_run_id})")]
    AlreadyIngested { ingest_post_id: i64, lss_run_id: i64 },
    /// Snapshot already at the terminal lifecycle stage
    #[error("Snapshot {snapshot_id} is already at the terminal lifecycle stage")]
    TerminalStage { snapshot_id: i64 },
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

fn invalid<T>(column: &'static str, value: impl Into<String>) -> Result<T> {
    Err(StorageError::InvalidValue {
        column,
        value: value.into(),
    })
}

// ============================================================================
// RECORD TYPES
// ============================================================================

/// Input for ingesting one post.
#[derive(Debug, Clone)]
pub struct NewIngestPost<'a> {
    pub source: &'a str,
    pub publisher: &'a str,
    pub source_post_id: &'a str,
    pub alias: Option<&'a str>,
    pub lang: Option<&'a str>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct IngestPostRecord {
    pub id: i64,
    pub source: String,
    pub publisher: String,
    pub source_post_id: String,
    pub alias: Option<String>,
    pub lang: Option<String>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LssRunRecord {
    pub id: i64,
    pub ingest_post_id: i64,
    pub engine: String,
    pub engine_version: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SectionRecord {
    pub id: i64,
    pub ordinal: i64,
    pub text: String,
    pub start_char: i64,
    pub end_char: i64,
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub section_id: Option<i64>,
    pub ordinal: i64,
    pub label: String,
    pub search_phrase: String,
    pub text: String,
    pub start_token: i64,
    pub end_token: i64,
    pub similarity: f64,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
}

#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub id: i64,
    pub lss_event_id: i64,
    pub role_kind: RoleKind,
    pub document_word: String,
    pub text: String,
    pub start_token: i64,
    pub end_token: i64,
    pub match_type: String,
    pub similarity: f64,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct SeriesRecord {
    pub id: i64,
    pub lss_event_id: i64,
    pub ordinal: i64,
    pub start_token: i64,
    pub end_token: i64,
}

#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: i64,
    pub series_id: i64,
    pub ordinal: i64,
    pub text: String,
    pub start_token: i64,
    pub end_token: i64,
}

#[derive(Debug, Clone)]
pub struct HintRecord {
    pub id: i64,
    pub ctx_kind: CtxKind,
    pub text: String,
    pub start_token: Option<i64>,
    pub end_token: Option<i64>,
    pub scope: CtxScope,
    /// Row id of the target within its scope; `None` for POST
    pub target_id: Option<i64>,
    pub source: HintSource,
}

/// One event to persist, with its section assignment.
#[derive(Debug, Clone)]
pub struct LssEventWrite<'a> {
    pub scoped: &'a ScopedEvent,
    pub section_ordinal: Option<usize>,
}

/// The full structural output of one LSS run.
#[derive(Debug, Clone)]
pub struct LssWrite<'a> {
    pub sections: &'a [LssSection],
    pub events: &'a [LssEventWrite<'a>],
    /// POST-, SECTION-, and EVENT-scoped hints addressed by ordinal
    pub run_hints: &'a [LssContextHint],
}

/// Row ids assigned during LSS persistence.
#[derive(Debug, Clone, Default)]
pub struct LssPersistIds {
    pub section_ids: Vec<i64>,
    pub event_ids: Vec<i64>,
}

/// Result of a DOM ingest transaction.
#[derive(Debug, Clone)]
pub struct DomIngest {
    pub dom_post_id: i64,
    pub snapshot_id: i64,
    pub post_node_id: i64,
    pub node_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotRecord {
    pub id: i64,
    pub dom_post_id: i64,
    pub stage: LifecycleStage,
}

#[derive(Debug, Clone)]
pub struct DomNodeRecord {
    pub id: i64,
    pub node_type: NodeType,
    pub parent_id: Option<i64>,
    pub sibling_order: i64,
    pub lss_event_id: Option<i64>,
    pub lss_section_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct DomNodeStateRecord {
    pub dom_node_id: i64,
    pub node_type: NodeType,
    pub selected: bool,
    pub summary: String,
    pub resolved: Option<bool>,
    pub resolution_source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DomContextRow {
    pub dom_node_id: i64,
    pub ctx_kind: CtxKind,
    pub ctx_value: String,
    pub overridden: bool,
}

/// Outcome of a context materialization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Written(usize),
    AlreadyMaterialized,
}

#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub candidate_key: u64,
    pub rank: i64,
    pub total_score: f64,
    pub signals_json: String,
}

#[derive(Debug, Clone)]
pub struct EligibilityRow {
    pub dom_node_id: i64,
    pub eligible: bool,
    pub reason: Option<String>,
}

/// Per-snapshot row counts over the snapshot-scoped tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRowCounts {
    pub node_states: i64,
    pub contexts: i64,
    pub candidates: i64,
    pub eligibility: i64,
}

// ============================================================================
// STORE
// ============================================================================

/// Transactional store over one SQLite database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        super::migrations::apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        super::migrations::apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // ========================================================================
    // INGEST POSTS
    // ========================================================================

    /// Insert an ingest post. Unique on (source, publisher, source_post_id).
    pub fn insert_ingest_post(&self, post: &NewIngestPost<'_>) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ingest_posts
                (source, publisher, source_post_id, alias, lang, published_at, fetched_at, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                post.source,
                post.publisher,
                post.source_post_id,
                post.alias,
                post.lang,
                post.published_at,
                post.fetched_at,
                post.text,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_ingest_post(&self, id: i64) -> Result<Option<IngestPostRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, source, publisher, source_post_id, alias, lang,
                    published_at, fetched_at, text
             FROM ingest_posts WHERE id = ?1",
            [id],
            |row| {
                Ok(IngestPostRecord {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    publisher: row.get(2)?,
                    source_post_id: row.get(3)?,
                    alias: row.get(4)?,
                    lang: row.get(5)?,
                    published_at: row.get(6)?,
                    fetched_at: row.get(7)?,
                    text: row.get(8)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    // ========================================================================
    // LSS RUNS
    // ========================================================================

    pub fn create_lss_run(
        &self,
        ingest_post_id: i64,
        engine: &str,
        engine_version: Option<&str>,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO lss_runs (ingest_post_id, engine, engine_version, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![ingest_post_id, engine, engine_version, started_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn complete_lss_run(&self, lss_run_id: i64, completed_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE lss_runs SET completed_at = ?1 WHERE id = ?2",
            params![completed_at, lss_run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(lss_run_id));
        }
        Ok(())
    }

    fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LssRunRecord> {
        Ok(LssRunRecord {
            id: row.get(0)?,
            ingest_post_id: row.get(1)?,
            engine: row.get(2)?,
            engine_version: row.get(3)?,
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
        })
    }

    pub fn get_lss_run(&self, lss_run_id: i64) -> Result<Option<LssRunRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, ingest_post_id, engine, engine_version, started_at, completed_at
             FROM lss_runs WHERE id = ?1",
            [lss_run_id],
            Self::run_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// The most recently completed run for a post is authoritative.
    pub fn latest_completed_run(&self, ingest_post_id: i64) -> Result<Option<LssRunRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, ingest_post_id, engine, engine_version, started_at, completed_at
             FROM lss_runs
             WHERE ingest_post_id = ?1 AND completed_at IS NOT NULL
             ORDER BY completed_at DESC, id DESC
             LIMIT 1",
            [ingest_post_id],
            Self::run_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn has_completed_run(&self, ingest_post_id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lss_runs
             WHERE ingest_post_id = ?1 AND completed_at IS NOT NULL",
            [ingest_post_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    // ========================================================================
    // LSS STRUCTURE PERSISTENCE
    // ========================================================================

    /// Persist the full structural output of one run in a single
    /// transaction.
    ///
    /// Hint `target_id` ordinals translate to row ids here: LOCATION
    /// hints address `lss_location_items.id`, SERIES hints
    /// `lss_location_series.id`, EVENT hints `lss_events.id`, SECTION
    /// hints `lss_sections.id`; POST hints stay NULL.
    pub fn persist_lss(
        &self,
        lss_run_id: i64,
        ingest_post_id: i64,
        write: &LssWrite<'_>,
    ) -> Result<LssPersistIds> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut ids = LssPersistIds::default();
        let mut section_id_by_ordinal: HashMap<usize, i64> = HashMap::new();
        let mut event_id_by_ordinal: HashMap<usize, i64> = HashMap::new();

        for section in write.sections {
            tx.execute(
                "INSERT INTO lss_sections
                    (lss_run_id, ingest_post_id, ordinal, text, start_char, end_char)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    lss_run_id,
                    ingest_post_id,
                    section.ordinal as i64,
                    section.text,
                    section.start_char as i64,
                    section.end_char as i64,
                ],
            )?;
            let id = tx.last_insert_rowid();
            section_id_by_ordinal.insert(section.ordinal, id);
            ids.section_ids.push(id);
        }

        for (ordinal, ev) in write.events.iter().enumerate() {
            let event = &ev.scoped.event;
            let section_id = ev
                .section_ordinal
                .and_then(|o| section_id_by_ordinal.get(&o))
                .copied();

            tx.execute(
                "INSERT INTO lss_events
                    (lss_run_id, section_id, ordinal, label, search_phrase, text,
                     start_token, end_token, similarity, negated, uncertain,
                     involves_coreference)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    lss_run_id,
                    section_id,
                    ordinal as i64,
                    event.label,
                    event.search_phrase,
                    event.text,
                    event.start_token as i64,
                    event.end_token as i64,
                    event.similarity,
                    event.negated,
                    event.uncertain,
                    event.involves_coreference,
                ],
            )?;
            let event_id = tx.last_insert_rowid();
            event_id_by_ordinal.insert(ordinal, event_id);
            ids.event_ids.push(event_id);

            for role in &ev.scoped.roles {
                tx.execute(
                    "INSERT INTO lss_role_candidates
                        (lss_event_id, role_kind, document_word, text, start_token,
                         end_token, match_type, similarity, negated, uncertain,
                         involves_coreference, explanation)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        event_id,
                        role.role_kind.as_str(),
                        role.document_word,
                        role.text,
                        role.start_token as i64,
                        role.end_token as i64,
                        role.match_type,
                        role.similarity,
                        role.negated,
                        role.uncertain,
                        role.involves_coreference,
                        role.explanation,
                    ],
                )?;
            }

            // item ordinal → row id, local to this event
            let mut series_id_by_ordinal: HashMap<usize, i64> = HashMap::new();
            let mut item_id_by_ordinal: HashMap<usize, i64> = HashMap::new();

            for series in &ev.scoped.series {
                tx.execute(
                    "INSERT INTO lss_location_series
                        (lss_event_id, ordinal, start_token, end_token)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        event_id,
                        series.series_id as i64,
                        series.start_token as i64,
                        series.end_token as i64,
                    ],
                )?;
                let series_row = tx.last_insert_rowid();
                series_id_by_ordinal.insert(series.series_id, series_row);

                for item in &series.items {
                    tx.execute(
                        "INSERT INTO lss_location_items
                            (series_id, ordinal, text, start_token, end_token)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            series_row,
                            item.item_id as i64,
                            item.text,
                            item.start_token as i64,
                            item.end_token as i64,
                        ],
                    )?;
                    item_id_by_ordinal.insert(item.item_id, tx.last_insert_rowid());
                }
            }

            for hint in &ev.scoped.hints {
                let target_row = match hint.scope {
                    CtxScope::Location => hint
                        .target_id
                        .and_then(|t| item_id_by_ordinal.get(&t))
                        .copied(),
                    CtxScope::Series => hint
                        .target_id
                        .and_then(|t| series_id_by_ordinal.get(&t))
                        .copied(),
                    CtxScope::Event => Some(event_id),
                    CtxScope::Section | CtxScope::Post => None,
                };
                Self::insert_hint(&tx, lss_run_id, hint, target_row)?;
            }
        }

        for hint in write.run_hints {
            let target_row = match hint.scope {
                CtxScope::Post => None,
                CtxScope::Section => hint
                    .target_id
                    .and_then(|t| section_id_by_ordinal.get(&t))
                    .copied(),
                CtxScope::Event => hint
                    .target_id
                    .and_then(|t| event_id_by_ordinal.get(&t))
                    .copied(),
                // SERIES/LOCATION hints are event-owned; they never
                // appear at run level
                CtxScope::Series | CtxScope::Location => None,
            };
            Self::insert_hint(&tx, lss_run_id, hint, target_row)?;
        }

        tx.commit()?;
        Ok(ids)
    }

    fn insert_hint(
        tx: &rusqlite::Transaction<'_>,
        lss_run_id: i64,
        hint: &LssContextHint,
        target_row: Option<i64>,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO lss_context_hints
                (lss_run_id, ctx_kind, text, start_token, end_token, scope, target_id, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                lss_run_id,
                hint.ctx_kind.as_str(),
                hint.text,
                hint.start_token.map(|t| t as i64),
                hint.end_token.map(|t| t as i64),
                hint.scope.as_str(),
                target_row,
                hint.source.as_str(),
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // LSS READS
    // ========================================================================

    pub fn list_lss_sections(&self, lss_run_id: i64) -> Result<Vec<SectionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, ordinal, text, start_char, end_char
             FROM lss_sections WHERE lss_run_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map([lss_run_id], |row| {
                Ok(SectionRecord {
                    id: row.get(0)?,
                    ordinal: row.get(1)?,
                    text: row.get(2)?,
                    start_char: row.get(3)?,
                    end_char: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_lss_events(&self, lss_run_id: i64) -> Result<Vec<EventRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, section_id, ordinal, label, search_phrase, text,
                    start_token, end_token, similarity, negated, uncertain,
                    involves_coreference
             FROM lss_events WHERE lss_run_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map([lss_run_id], |row| {
                Ok(EventRecord {
                    id: row.get(0)?,
                    section_id: row.get(1)?,
                    ordinal: row.get(2)?,
                    label: row.get(3)?,
                    search_phrase: row.get(4)?,
                    text: row.get(5)?,
                    start_token: row.get(6)?,
                    end_token: row.get(7)?,
                    similarity: row.get(8)?,
                    negated: row.get(9)?,
                    uncertain: row.get(10)?,
                    involves_coreference: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_role_candidates(&self, lss_event_id: i64) -> Result<Vec<RoleRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, lss_event_id, role_kind, document_word, text, start_token,
                    end_token, match_type, similarity, negated, uncertain,
                    involves_coreference, explanation
             FROM lss_role_candidates WHERE lss_event_id = ?1 ORDER BY id",
        )?;
        let raw = stmt
            .query_map([lss_event_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, f64>(8)?,
                    row.get::<_, bool>(9)?,
                    row.get::<_, bool>(10)?,
                    row.get::<_, bool>(11)?,
                    row.get::<_, String>(12)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|r| {
                let Some(role_kind) = RoleKind::parse(&r.2) else {
                    return invalid("role_kind", r.2);
                };
                Ok(RoleRecord {
                    id: r.0,
                    lss_event_id: r.1,
                    role_kind,
                    document_word: r.3,
                    text: r.4,
                    start_token: r.5,
                    end_token: r.6,
                    match_type: r.7,
                    similarity: r.8,
                    negated: r.9,
                    uncertain: r.10,
                    involves_coreference: r.11,
                    explanation: r.12,
                })
            })
            .collect()
    }

    /// All series of a run, event-ordered then series-ordered.
    pub fn list_location_series(&self, lss_run_id: i64) -> Result<Vec<SeriesRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT ls.id, ls.lss_event_id, ls.ordinal, ls.start_token, ls.end_token
             FROM lss_location_series ls
             JOIN lss_events e ON e.id = ls.lss_event_id
             WHERE e.lss_run_id = ?1
             ORDER BY e.ordinal, ls.ordinal",
        )?;
        let rows = stmt
            .query_map([lss_run_id], |row| {
                Ok(SeriesRecord {
                    id: row.get(0)?,
                    lss_event_id: row.get(1)?,
                    ordinal: row.get(2)?,
                    start_token: row.get(3)?,
                    end_token: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All items of a run, in document order within each series.
    pub fn list_location_items(&self, lss_run_id: i64) -> Result<Vec<ItemRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT li.id, li.series_id, li.ordinal, li.text, li.start_token, li.end_token
             FROM lss_location_items li
             JOIN lss_location_series ls ON ls.id = li.series_id
             JOIN lss_events e ON e.id = ls.lss_event_id
             WHERE e.lss_run_id = ?1
             ORDER BY e.ordinal, ls.ordinal, li.ordinal",
        )?;
        let rows = stmt
            .query_map([lss_run_id], |row| {
                Ok(ItemRecord {
                    id: row.get(0)?,
                    series_id: row.get(1)?,
                    ordinal: row.get(2)?,
                    text: row.get(3)?,
                    start_token: row.get(4)?,
                    end_token: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_context_hints(&self, lss_run_id: i64) -> Result<Vec<HintRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, ctx_kind, text, start_token, end_token, scope, target_id, source
             FROM lss_context_hints WHERE lss_run_id = ?1 ORDER BY id",
        )?;
        let raw = stmt
            .query_map([lss_run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|r| {
                let Some(scope) = CtxScope::parse(&r.5) else {
                    return invalid("scope", r.5);
                };
                let Some(source) = HintSource::parse(&r.7) else {
                    return invalid("source", r.7);
                };
                Ok(HintRecord {
                    id: r.0,
                    ctx_kind: CtxKind::parse(&r.1),
                    text: r.2,
                    start_token: r.3,
                    end_token: r.4,
                    scope,
                    target_id: r.6,
                    source,
                })
            })
            .collect()
    }

    // ========================================================================
    // DOM INGEST
    // ========================================================================

    /// Materialize the DOM tree for `(ingest_post_id, lss_run_id)` at a
    /// CREATED snapshot. One transaction; preconditions checked inside.
    pub fn dom_ingest(
        &self,
        ingest_post_id: i64,
        lss_run_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<DomIngest> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // ----------------------------------------------------------
        // Preconditions
        // ----------------------------------------------------------

        let run: Option<(i64, Option<DateTime<Utc>>)> = tx
            .query_row(
                "SELECT ingest_post_id, completed_at FROM lss_runs WHERE id = ?1",
                [lss_run_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((run_post_id, completed_at)) = run else {
            return Err(StorageError::RunNotFound(lss_run_id));
        };
        if run_post_id != ingest_post_id {
            return Err(StorageError::RunPostMismatch {
                lss_run_id,
                ingest_post_id,
            });
        }
        if completed_at.is_none() {
            return Err(StorageError::RunIncomplete(lss_run_id));
        }

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM dom_post WHERE ingest_post_id = ?1 AND lss_run_id = ?2",
                params![ingest_post_id, lss_run_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::AlreadyIngested {
                ingest_post_id,
                lss_run_id,
            });
        }

        // ----------------------------------------------------------
        // dom_post + CREATED snapshot + POST node
        // ----------------------------------------------------------

        tx.execute(
            "INSERT INTO dom_post (ingest_post_id, lss_run_id) VALUES (?1, ?2)",
            params![ingest_post_id, lss_run_id],
        )?;
        let dom_post_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO dom_snapshot (dom_post_id, lifecycle_stage_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![dom_post_id, LifecycleStage::Created.id(), created_at],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        let post_node_id = Self::insert_node(&tx, dom_post_id, NodeType::Post, None, 0)?;
        tx.execute(
            "INSERT INTO dom_node_provenance (dom_node_id) VALUES (?1)",
            [post_node_id],
        )?;

        // ----------------------------------------------------------
        // Sections → SECTION nodes
        // ----------------------------------------------------------

        let mut section_node_ids: HashMap<i64, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT id, ordinal FROM lss_sections WHERE lss_run_id = ?1 ORDER BY ordinal",
            )?;
            let sections = stmt
                .query_map([lss_run_id], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            for (section_id, ordinal) in sections {
                let node_id = Self::insert_node(
                    &tx,
                    dom_post_id,
                    NodeType::Section,
                    Some(post_node_id),
                    ordinal,
                )?;
                tx.execute(
                    "INSERT INTO dom_node_provenance (dom_node_id, lss_section_ids)
                     VALUES (?1, json_array(?2))",
                    params![node_id, section_id],
                )?;
                section_node_ids.insert(section_id, node_id);
            }
        }

        // ----------------------------------------------------------
        // Events → EVENT nodes (under their section, else POST)
        // ----------------------------------------------------------

        let mut event_node_ids: HashMap<i64, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT id, section_id FROM lss_events WHERE lss_run_id = ?1 ORDER BY ordinal",
            )?;
            let events = stmt
                .query_map([lss_run_id], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            let mut sibling_counter: HashMap<i64, i64> = HashMap::new();
            for (event_id, section_id) in events {
                let parent_id = section_id
                    .and_then(|sid| section_node_ids.get(&sid))
                    .copied()
                    .unwrap_or(post_node_id);

                let order = sibling_counter.entry(parent_id).or_insert(0);
                let node_id = Self::insert_node(
                    &tx,
                    dom_post_id,
                    NodeType::Event,
                    Some(parent_id),
                    *order,
                )?;
                *order += 1;

                tx.execute(
                    "INSERT INTO dom_node_provenance (dom_node_id, lss_event_id)
                     VALUES (?1, ?2)",
                    params![node_id, event_id],
                )?;
                event_node_ids.insert(event_id, node_id);
            }
        }

        // ----------------------------------------------------------
        // Series → LOCATION_SERIES nodes, items → LOCATION nodes
        // ----------------------------------------------------------

        let mut series_node_ids: HashMap<i64, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT ls.id, ls.lss_event_id, ls.ordinal
                 FROM lss_location_series ls
                 JOIN lss_events e ON e.id = ls.lss_event_id
                 WHERE e.lss_run_id = ?1
                 ORDER BY e.ordinal, ls.ordinal",
            )?;
            let series = stmt
                .query_map([lss_run_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            for (series_id, event_id, ordinal) in series {
                let parent = event_node_ids.get(&event_id).copied().ok_or_else(|| {
                    StorageError::NotFound(format!("EVENT node for lss event {event_id}"))
                })?;
                let node_id = Self::insert_node(
                    &tx,
                    dom_post_id,
                    NodeType::LocationSeries,
                    Some(parent),
                    ordinal,
                )?;
                tx.execute(
                    "INSERT INTO dom_node_provenance (dom_node_id) VALUES (?1)",
                    [node_id],
                )?;
                series_node_ids.insert(series_id, node_id);
            }
        }

        {
            let mut stmt = tx.prepare(
                "SELECT li.id, li.series_id
                 FROM lss_location_items li
                 JOIN lss_location_series ls ON ls.id = li.series_id
                 JOIN lss_events e ON e.id = ls.lss_event_id
                 WHERE e.lss_run_id = ?1
                 ORDER BY e.ordinal, ls.ordinal, li.ordinal",
            )?;
            let items = stmt
                .query_map([lss_run_id], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            let mut sibling_counter: HashMap<i64, i64> = HashMap::new();
            for (_item_id, series_id) in items {
                let parent = series_node_ids.get(&series_id).copied().ok_or_else(|| {
                    StorageError::NotFound(format!("SERIES node for lss series {series_id}"))
                })?;
                let order = sibling_counter.entry(parent).or_insert(0);
                let node_id = Self::insert_node(
                    &tx,
                    dom_post_id,
                    NodeType::Location,
                    Some(parent),
                    *order,
                )?;
                *order += 1;
                tx.execute(
                    "INSERT INTO dom_node_provenance (dom_node_id) VALUES (?1)",
                    [node_id],
                )?;
            }
        }

        // ----------------------------------------------------------
        // Initialize per-node state at the new snapshot
        // ----------------------------------------------------------

        let node_count = tx.execute(
            "INSERT INTO dom_node_state
                (dom_snapshot_id, dom_node_id, selected, summary, resolved, resolution_source)
             SELECT ?1, id, 1, '', NULL, NULL FROM dom_node WHERE dom_post_id = ?2",
            params![snapshot_id, dom_post_id],
        )?;

        tx.commit()?;

        tracing::info!(
            ingest_post_id,
            lss_run_id,
            dom_post_id,
            snapshot_id,
            nodes = node_count,
            "DOM ingested at CREATED"
        );

        Ok(DomIngest {
            dom_post_id,
            snapshot_id,
            post_node_id,
            node_count,
        })
    }

    fn insert_node(
        tx: &rusqlite::Transaction<'_>,
        dom_post_id: i64,
        node_type: NodeType,
        parent_id: Option<i64>,
        sibling_order: i64,
    ) -> Result<i64> {
        tx.execute(
            "INSERT INTO dom_node (dom_post_id, node_type, parent_id, sibling_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![dom_post_id, node_type.as_str(), parent_id, sibling_order],
        )?;
        Ok(tx.last_insert_rowid())
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    pub fn get_dom_post(&self, ingest_post_id: i64, lss_run_id: i64) -> Result<Option<i64>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id FROM dom_post WHERE ingest_post_id = ?1 AND lss_run_id = ?2",
            params![ingest_post_id, lss_run_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn dom_post_run(&self, dom_post_id: i64) -> Result<(i64, i64)> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT ingest_post_id, lss_run_id FROM dom_post WHERE id = ?1",
            [dom_post_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("dom_post {dom_post_id}")))
    }

    pub fn get_snapshot(&self, snapshot_id: i64) -> Result<SnapshotRecord> {
        let conn = self.lock()?;
        let raw: Option<(i64, i64)> = conn
            .query_row(
                "SELECT dom_post_id, lifecycle_stage_id FROM dom_snapshot WHERE id = ?1",
                [snapshot_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((dom_post_id, stage_id)) = raw else {
            return Err(StorageError::NotFound(format!("dom_snapshot {snapshot_id}")));
        };
        let Some(stage) = LifecycleStage::from_id(stage_id) else {
            return invalid("lifecycle_stage_id", stage_id.to_string());
        };

        Ok(SnapshotRecord {
            id: snapshot_id,
            dom_post_id,
            stage,
        })
    }

    /// All snapshots of a post, oldest first.
    pub fn snapshots_for_post(&self, dom_post_id: i64) -> Result<Vec<SnapshotRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, lifecycle_stage_id FROM dom_snapshot
             WHERE dom_post_id = ?1 ORDER BY id",
        )?;
        let raw = stmt
            .query_map([dom_post_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|(id, stage_id)| {
                let Some(stage) = LifecycleStage::from_id(stage_id) else {
                    return invalid("lifecycle_stage_id", stage_id.to_string());
                };
                Ok(SnapshotRecord {
                    id,
                    dom_post_id,
                    stage,
                })
            })
            .collect()
    }

    /// Advance a snapshot to the next lifecycle stage, cloning every
    /// snapshot-scoped row. The prior snapshot stays queryable.
    pub fn advance_snapshot(&self, snapshot_id: i64, created_at: DateTime<Utc>) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let raw: Option<(i64, i64)> = tx
            .query_row(
                "SELECT dom_post_id, lifecycle_stage_id FROM dom_snapshot WHERE id = ?1",
                [snapshot_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((dom_post_id, stage_id)) = raw else {
            return Err(StorageError::NotFound(format!("dom_snapshot {snapshot_id}")));
        };
        let Some(stage) = LifecycleStage::from_id(stage_id) else {
            return invalid("lifecycle_stage_id", stage_id.to_string());
        };
        let Some(next) = stage.next() else {
            return Err(StorageError::TerminalStage { snapshot_id });
        };

        tx.execute(
            "INSERT INTO dom_snapshot (dom_post_id, lifecycle_stage_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![dom_post_id, next.id(), created_at],
        )?;
        let new_snapshot_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO dom_node_state
                (dom_snapshot_id, dom_node_id, selected, summary, resolved, resolution_source)
             SELECT ?1, dom_node_id, selected, summary, resolved, resolution_source
             FROM dom_node_state WHERE dom_snapshot_id = ?2",
            params![new_snapshot_id, snapshot_id],
        )?;
        tx.execute(
            "INSERT INTO dom_context
                (dom_snapshot_id, dom_node_id, ctx_kind, ctx_value, overridden)
             SELECT ?1, dom_node_id, ctx_kind, ctx_value, overridden
             FROM dom_context WHERE dom_snapshot_id = ?2",
            params![new_snapshot_id, snapshot_id],
        )?;
        tx.execute(
            "INSERT INTO dom_location_candidate
                (dom_snapshot_id, dom_node_id, candidate_key, rank, total_score, signals_json)
             SELECT ?1, dom_node_id, candidate_key, rank, total_score, signals_json
             FROM dom_location_candidate WHERE dom_snapshot_id = ?2",
            params![new_snapshot_id, snapshot_id],
        )?;
        tx.execute(
            "INSERT INTO dom_commit_eligibility
                (dom_snapshot_id, dom_node_id, eligible, reason)
             SELECT ?1, dom_node_id, eligible, reason
             FROM dom_commit_eligibility WHERE dom_snapshot_id = ?2",
            params![new_snapshot_id, snapshot_id],
        )?;

        tx.commit()?;

        tracing::info!(
            snapshot_id,
            new_snapshot_id,
            from = stage.as_str(),
            to = next.as_str(),
            "snapshot advanced"
        );

        Ok(new_snapshot_id)
    }

    // ========================================================================
    // DOM NODES AND STATE
    // ========================================================================

    /// The full node arena of a post with provenance, in id order
    /// (creation order: parents before children).
    pub fn load_nodes(&self, dom_post_id: i64) -> Result<Vec<DomNodeRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT n.id, n.node_type, n.parent_id, n.sibling_order,
                    p.lss_event_id, p.lss_section_ids
             FROM dom_node n
             LEFT JOIN dom_node_provenance p ON p.dom_node_id = n.id
             WHERE n.dom_post_id = ?1
             ORDER BY n.id",
        )?;
        let raw = stmt
            .query_map([dom_post_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|r| {
                let Some(node_type) = NodeType::parse(&r.1) else {
                    return invalid("node_type", r.1);
                };
                let lss_section_ids = match r.5 {
                    Some(json) => serde_json::from_str(&json)?,
                    None => Vec::new(),
                };
                Ok(DomNodeRecord {
                    id: r.0,
                    node_type,
                    parent_id: r.2,
                    sibling_order: r.3,
                    lss_event_id: r.4,
                    lss_section_ids,
                })
            })
            .collect()
    }

    pub fn node_state(&self, snapshot_id: i64, node_id: i64) -> Result<DomNodeStateRecord> {
        let conn = self.lock()?;
        let raw: Option<(bool, String, Option<bool>, Option<String>, String)> = conn
            .query_row(
                "SELECT st.selected, st.summary, st.resolved, st.resolution_source, n.node_type
                 FROM dom_node_state st
                 JOIN dom_node n ON n.id = st.dom_node_id
                 WHERE st.dom_snapshot_id = ?1 AND st.dom_node_id = ?2",
                params![snapshot_id, node_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((selected, summary, resolved, resolution_source, type_str)) = raw else {
            return Err(StorageError::NotFound(format!(
                "dom_node_state ({snapshot_id}, {node_id})"
            )));
        };
        let Some(node_type) = NodeType::parse(&type_str) else {
            return invalid("node_type", type_str);
        };

        Ok(DomNodeStateRecord {
            dom_node_id: node_id,
            node_type,
            selected,
            summary,
            resolved,
            resolution_source,
        })
    }

    /// All node states at a snapshot, with node types.
    pub fn list_node_states(&self, snapshot_id: i64) -> Result<Vec<DomNodeStateRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT st.dom_node_id, n.node_type, st.selected, st.summary,
                    st.resolved, st.resolution_source
             FROM dom_node_state st
             JOIN dom_node n ON n.id = st.dom_node_id
             WHERE st.dom_snapshot_id = ?1
             ORDER BY st.dom_node_id",
        )?;
        let raw = stmt
            .query_map([snapshot_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|r| {
                let Some(node_type) = NodeType::parse(&r.1) else {
                    return invalid("node_type", r.1);
                };
                Ok(DomNodeStateRecord {
                    dom_node_id: r.0,
                    node_type,
                    selected: r.2,
                    summary: r.3,
                    resolved: r.4,
                    resolution_source: r.5,
                })
            })
            .collect()
    }

    pub fn set_selected(&self, snapshot_id: i64, node_id: i64, selected: bool) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE dom_node_state SET selected = ?1
             WHERE dom_snapshot_id = ?2 AND dom_node_id = ?3",
            params![selected, snapshot_id, node_id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!(
                "dom_node_state ({snapshot_id}, {node_id})"
            )));
        }
        Ok(())
    }

    pub fn set_summary(&self, snapshot_id: i64, node_id: i64, summary: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE dom_node_state SET summary = ?1
             WHERE dom_snapshot_id = ?2 AND dom_node_id = ?3",
            params![summary, snapshot_id, node_id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!(
                "dom_node_state ({snapshot_id}, {node_id})"
            )));
        }
        Ok(())
    }

    /// Record resolution outcome on a LOCATION node's state.
    pub fn set_resolution(
        &self,
        snapshot_id: i64,
        node_id: i64,
        resolved: Option<bool>,
        resolution_source: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE dom_node_state SET resolved = ?1, resolution_source = ?2
             WHERE dom_snapshot_id = ?3 AND dom_node_id = ?4",
            params![resolved, resolution_source, snapshot_id, node_id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!(
                "dom_node_state ({snapshot_id}, {node_id})"
            )));
        }
        Ok(())
    }

    // ========================================================================
    // DOM CONTEXT
    // ========================================================================

    /// Write dominance-resolved context rows, exactly once per snapshot.
    pub fn materialize_contexts(
        &self,
        snapshot_id: i64,
        rows: &[DomContextRow],
    ) -> Result<MaterializeOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM dom_context WHERE dom_snapshot_id = ?1 LIMIT 1",
                [snapshot_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            tracing::warn!(snapshot_id, "context already materialized; refusing");
            return Ok(MaterializeOutcome::AlreadyMaterialized);
        }

        for row in rows {
            tx.execute(
                "INSERT OR IGNORE INTO dom_context
                    (dom_snapshot_id, dom_node_id, ctx_kind, ctx_value, overridden)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot_id,
                    row.dom_node_id,
                    row.ctx_kind.as_str(),
                    row.ctx_value,
                    row.overridden,
                ],
            )?;
        }

        tx.commit()?;
        Ok(MaterializeOutcome::Written(rows.len()))
    }

    /// Effective contexts at one node.
    pub fn contexts_for_node(&self, snapshot_id: i64, node_id: i64) -> Result<Vec<DomContextRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT ctx_kind, ctx_value, overridden
             FROM dom_context
             WHERE dom_snapshot_id = ?1 AND dom_node_id = ?2
             ORDER BY ctx_kind, ctx_value",
        )?;
        let rows = stmt
            .query_map(params![snapshot_id, node_id], |row| {
                Ok(DomContextRow {
                    dom_node_id: node_id,
                    ctx_kind: CtxKind::parse(&row.get::<_, String>(0)?),
                    ctx_value: row.get(1)?,
                    overridden: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========================================================================
    // LOCATION CANDIDATES
    // ========================================================================

    /// Replace the candidate list for one LOCATION node at a snapshot.
    pub fn write_location_candidates(
        &self,
        snapshot_id: i64,
        node_id: i64,
        rows: &[CandidateRow],
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM dom_location_candidate
             WHERE dom_snapshot_id = ?1 AND dom_node_id = ?2",
            params![snapshot_id, node_id],
        )?;

        for row in rows {
            tx.execute(
                "INSERT INTO dom_location_candidate
                    (dom_snapshot_id, dom_node_id, candidate_key, rank, total_score, signals_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    snapshot_id,
                    node_id,
                    row.candidate_key as i64,
                    row.rank,
                    row.total_score,
                    row.signals_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Candidates for a node, rank order.
    pub fn candidates_for_node(&self, snapshot_id: i64, node_id: i64) -> Result<Vec<CandidateRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT candidate_key, rank, total_score, signals_json
             FROM dom_location_candidate
             WHERE dom_snapshot_id = ?1 AND dom_node_id = ?2
             ORDER BY rank",
        )?;
        let rows = stmt
            .query_map(params![snapshot_id, node_id], |row| {
                Ok(CandidateRow {
                    candidate_key: row.get::<_, i64>(0)? as u64,
                    rank: row.get(1)?,
                    total_score: row.get(2)?,
                    signals_json: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========================================================================
    // COMMIT ELIGIBILITY
    // ========================================================================

    /// Clear and rewrite eligibility rows for a snapshot.
    pub fn replace_commit_eligibility(
        &self,
        snapshot_id: i64,
        rows: &[EligibilityRow],
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM dom_commit_eligibility WHERE dom_snapshot_id = ?1",
            [snapshot_id],
        )?;

        for row in rows {
            tx.execute(
                "INSERT INTO dom_commit_eligibility
                    (dom_snapshot_id, dom_node_id, eligible, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                params![snapshot_id, row.dom_node_id, row.eligible, row.reason],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_commit_eligibility(&self, snapshot_id: i64) -> Result<Vec<EligibilityRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT dom_node_id, eligible, reason
             FROM dom_commit_eligibility
             WHERE dom_snapshot_id = ?1
             ORDER BY dom_node_id",
        )?;
        let rows = stmt
            .query_map([snapshot_id], |row| {
                Ok(EligibilityRow {
                    dom_node_id: row.get(0)?,
                    eligible: row.get(1)?,
                    reason: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    /// Row counts over the snapshot-scoped tables; the clone invariant
    /// check after advance.
    pub fn snapshot_row_counts(&self, snapshot_id: i64) -> Result<SnapshotRowCounts> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE dom_snapshot_id = ?1");
            conn.query_row(&sql, [snapshot_id], |row| row.get(0))
                .map_err(Into::into)
        };
        Ok(SnapshotRowCounts {
            node_states: count("dom_node_state")?,
            contexts: count("dom_context")?,
            candidates: count("dom_location_candidate")?,
            eligibility: count("dom_commit_eligibility")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lss::{LssLocationItem, LssLocationSeries, LssRoleCandidate, LssSection};

    fn post(store: &Store) -> i64 {
        store
            .insert_ingest_post(&NewIngestPost {
                source: "telegram",
                publisher: "channel",
                source_post_id: "42",
                alias: None,
                lang: Some("en"),
                published_at: Utc::now(),
                fetched_at: Utc::now(),
                text: "Forces shelled Avdiivka.",
            })
            .unwrap()
    }

    fn scoped_event() -> ScopedEvent {
        ScopedEvent {
            event: crate::lss::EventMatch {
                event_uid: "1:0".to_string(),
                label: "EVENT:shelling".to_string(),
                search_phrase: "shelling".to_string(),
                text: "Forces shelled Avdiivka.".to_string(),
                similarity: 0.9,
                negated: false,
                uncertain: false,
                involves_coreference: false,
                start_token: 1,
                end_token: 2,
            },
            roles: vec![LssRoleCandidate {
                role_kind: RoleKind::Action,
                document_word: "shelled".to_string(),
                text: "shelled".to_string(),
                start_token: 1,
                end_token: 2,
                match_type: "verb".to_string(),
                negated: false,
                uncertain: false,
                involves_coreference: false,
                similarity: 0.9,
                explanation: String::new(),
            }],
            series: vec![LssLocationSeries {
                series_id: 0,
                start_token: 2,
                end_token: 3,
                items: vec![LssLocationItem {
                    item_id: 0,
                    text: "Avdiivka".to_string(),
                    start_token: 2,
                    end_token: 3,
                }],
            }],
            hints: vec![LssContextHint {
                ctx_kind: CtxKind::Region,
                text: "Donetsk Oblast".to_string(),
                start_token: Some(4),
                end_token: Some(6),
                scope: CtxScope::Location,
                target_id: Some(0),
                source: crate::lss::HintSource::Gazetteer,
            }],
        }
    }

    #[test]
    fn test_ingest_post_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let id = post(&store);
        let record = store.get_ingest_post(id).unwrap().unwrap();
        assert_eq!(record.source, "telegram");
        assert_eq!(record.text, "Forces shelled Avdiivka.");
        assert!(store.get_ingest_post(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_post_identity_rejected() {
        let store = Store::open_in_memory().unwrap();
        post(&store);
        let dup = store.insert_ingest_post(&NewIngestPost {
            source: "telegram",
            publisher: "channel",
            source_post_id: "42",
            alias: None,
            lang: None,
            published_at: Utc::now(),
            fetched_at: Utc::now(),
            text: "same upstream identity",
        });
        assert!(matches!(dup, Err(StorageError::Database(_))));
    }

    #[test]
    fn test_run_lifecycle_and_latest_completed() {
        let store = Store::open_in_memory().unwrap();
        let post_id = post(&store);

        let abandoned = store
            .create_lss_run(post_id, "annotator", Some("1.0"), Utc::now())
            .unwrap();
        assert!(!store.has_completed_run(post_id).unwrap());

        let completed = store
            .create_lss_run(post_id, "annotator", Some("1.1"), Utc::now())
            .unwrap();
        store.complete_lss_run(completed, Utc::now()).unwrap();

        assert!(store.has_completed_run(post_id).unwrap());
        let latest = store.latest_completed_run(post_id).unwrap().unwrap();
        assert_eq!(latest.id, completed);

        // The abandoned run stays visible with no completion time
        let record = store.get_lss_run(abandoned).unwrap().unwrap();
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_persist_lss_maps_hint_targets_to_row_ids() {
        let store = Store::open_in_memory().unwrap();
        let post_id = post(&store);
        let run_id = store
            .create_lss_run(post_id, "annotator", None, Utc::now())
            .unwrap();

        let scoped = scoped_event();
        let sections = vec![LssSection {
            ordinal: 0,
            text: "Forces shelled Avdiivka.".to_string(),
            start_char: 0,
            end_char: 24,
        }];
        store
            .persist_lss(
                run_id,
                post_id,
                &LssWrite {
                    sections: &sections,
                    events: &[LssEventWrite {
                        scoped: &scoped,
                        section_ordinal: Some(0),
                    }],
                    run_hints: &[],
                },
            )
            .unwrap();

        let events = store.list_lss_events(run_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, "EVENT:shelling");

        let items = store.list_location_items(run_id).unwrap();
        assert_eq!(items.len(), 1);

        let hints = store.list_context_hints(run_id).unwrap();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].scope, CtxScope::Location);
        assert_eq!(hints[0].target_id, Some(items[0].id));

        let roles = store.list_role_candidates(events[0].id).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_kind, RoleKind::Action);
    }
}
