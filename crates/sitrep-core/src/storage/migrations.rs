//! Database Migrations
//!
//! Schema migration definitions for the storage layer. The relational
//! layout is the persistence contract: ingest posts, LSS runs and their
//! structural rows, and the snapshot-versioned DOM. Foreign keys cascade
//! from `dom_post` downward.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: ingest posts, LSS runs, snapshot-versioned DOM",
    up: MIGRATION_V1_UP,
}];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
-- ============================================================================
-- Ingest
-- ============================================================================

CREATE TABLE IF NOT EXISTS ingest_posts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source          TEXT NOT NULL,
    publisher       TEXT NOT NULL,
    source_post_id  TEXT NOT NULL,
    alias           TEXT,
    lang            TEXT,
    published_at    TEXT NOT NULL,
    fetched_at      TEXT NOT NULL,
    text            TEXT NOT NULL,
    UNIQUE (source, publisher, source_post_id)
);

CREATE INDEX IF NOT EXISTS idx_ingest_posts_published
    ON ingest_posts(source, published_at);

-- ============================================================================
-- LSS runs and structural rows
-- ============================================================================

CREATE TABLE IF NOT EXISTS lss_runs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    ingest_post_id  INTEGER NOT NULL REFERENCES ingest_posts(id),
    engine          TEXT NOT NULL,
    engine_version  TEXT,
    started_at      TEXT NOT NULL,
    completed_at    TEXT
);

CREATE INDEX IF NOT EXISTS idx_lss_runs_post
    ON lss_runs(ingest_post_id, completed_at);

CREATE TABLE IF NOT EXISTS lss_sections (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lss_run_id      INTEGER NOT NULL REFERENCES lss_runs(id) ON DELETE CASCADE,
    ingest_post_id  INTEGER NOT NULL REFERENCES ingest_posts(id),
    ordinal         INTEGER NOT NULL,
    text            TEXT NOT NULL,
    start_char      INTEGER NOT NULL,
    end_char        INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lss_sections_run
    ON lss_sections(lss_run_id, ordinal);

CREATE TABLE IF NOT EXISTS lss_events (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    lss_run_id           INTEGER NOT NULL REFERENCES lss_runs(id) ON DELETE CASCADE,
    section_id           INTEGER REFERENCES lss_sections(id),
    ordinal              INTEGER NOT NULL,
    label                TEXT NOT NULL,
    search_phrase        TEXT NOT NULL,
    text                 TEXT NOT NULL,
    start_token          INTEGER NOT NULL,
    end_token            INTEGER NOT NULL,
    similarity           REAL NOT NULL,
    negated              INTEGER NOT NULL DEFAULT 0,
    uncertain            INTEGER NOT NULL DEFAULT 0,
    involves_coreference INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_lss_events_run
    ON lss_events(lss_run_id, ordinal);

CREATE TABLE IF NOT EXISTS lss_role_candidates (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    lss_event_id         INTEGER NOT NULL REFERENCES lss_events(id) ON DELETE CASCADE,
    role_kind            TEXT NOT NULL,
    document_word        TEXT NOT NULL,
    text                 TEXT NOT NULL,
    start_token          INTEGER NOT NULL,
    end_token            INTEGER NOT NULL,
    match_type           TEXT NOT NULL,
    similarity           REAL NOT NULL,
    negated              INTEGER NOT NULL DEFAULT 0,
    uncertain            INTEGER NOT NULL DEFAULT 0,
    involves_coreference INTEGER NOT NULL DEFAULT 0,
    explanation          TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_lss_roles_event
    ON lss_role_candidates(lss_event_id);

CREATE TABLE IF NOT EXISTS lss_location_series (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lss_event_id    INTEGER NOT NULL REFERENCES lss_events(id) ON DELETE CASCADE,
    ordinal         INTEGER NOT NULL,
    start_token     INTEGER NOT NULL,
    end_token       INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lss_series_event
    ON lss_location_series(lss_event_id, ordinal);

CREATE TABLE IF NOT EXISTS lss_location_items (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    series_id       INTEGER NOT NULL REFERENCES lss_location_series(id) ON DELETE CASCADE,
    ordinal         INTEGER NOT NULL,
    text            TEXT NOT NULL,
    start_token     INTEGER NOT NULL,
    end_token       INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lss_items_series
    ON lss_location_items(series_id, ordinal);

CREATE TABLE IF NOT EXISTS lss_context_hints (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lss_run_id      INTEGER NOT NULL REFERENCES lss_runs(id) ON DELETE CASCADE,
    ctx_kind        TEXT NOT NULL,
    text            TEXT NOT NULL DEFAULT '',
    start_token     INTEGER,
    end_token       INTEGER,
    scope           TEXT NOT NULL,
    target_id       INTEGER,
    source          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lss_hints_run
    ON lss_context_hints(lss_run_id, scope);

-- ============================================================================
-- DOM
-- ============================================================================

CREATE TABLE IF NOT EXISTS dom_post (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    ingest_post_id  INTEGER NOT NULL REFERENCES ingest_posts(id),
    lss_run_id      INTEGER NOT NULL REFERENCES lss_runs(id),
    UNIQUE (ingest_post_id, lss_run_id)
);

CREATE TABLE IF NOT EXISTS dom_lifecycle_stage (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO dom_lifecycle_stage (id, name) VALUES
    (1, 'CREATED'),
    (2, 'INITIAL_REVIEW'),
    (3, 'PROCESSED'),
    (4, 'FINAL_REVIEW'),
    (5, 'AUDIT');

CREATE TABLE IF NOT EXISTS dom_snapshot (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    dom_post_id         INTEGER NOT NULL REFERENCES dom_post(id) ON DELETE CASCADE,
    lifecycle_stage_id  INTEGER NOT NULL REFERENCES dom_lifecycle_stage(id),
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dom_snapshot_post
    ON dom_snapshot(dom_post_id, lifecycle_stage_id);

CREATE TABLE IF NOT EXISTS dom_node (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    dom_post_id     INTEGER NOT NULL REFERENCES dom_post(id) ON DELETE CASCADE,
    node_type       TEXT NOT NULL,
    parent_id       INTEGER REFERENCES dom_node(id),
    sibling_order   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dom_node_post
    ON dom_node(dom_post_id, parent_id, sibling_order);

CREATE TABLE IF NOT EXISTS dom_node_provenance (
    dom_node_id     INTEGER PRIMARY KEY REFERENCES dom_node(id) ON DELETE CASCADE,
    lss_event_id    INTEGER REFERENCES lss_events(id),
    lss_section_ids TEXT
);

CREATE TABLE IF NOT EXISTS dom_node_state (
    dom_snapshot_id   INTEGER NOT NULL REFERENCES dom_snapshot(id) ON DELETE CASCADE,
    dom_node_id       INTEGER NOT NULL REFERENCES dom_node(id) ON DELETE CASCADE,
    selected          INTEGER NOT NULL DEFAULT 1,
    summary           TEXT NOT NULL DEFAULT '',
    resolved          INTEGER,
    resolution_source TEXT,
    PRIMARY KEY (dom_snapshot_id, dom_node_id)
);

CREATE TABLE IF NOT EXISTS dom_context (
    dom_snapshot_id INTEGER NOT NULL REFERENCES dom_snapshot(id) ON DELETE CASCADE,
    dom_node_id     INTEGER NOT NULL REFERENCES dom_node(id) ON DELETE CASCADE,
    ctx_kind        TEXT NOT NULL,
    ctx_value       TEXT NOT NULL,
    overridden      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (dom_snapshot_id, dom_node_id, ctx_kind, ctx_value)
);

CREATE TABLE IF NOT EXISTS dom_location_candidate (
    dom_snapshot_id INTEGER NOT NULL REFERENCES dom_snapshot(id) ON DELETE CASCADE,
    dom_node_id     INTEGER NOT NULL REFERENCES dom_node(id) ON DELETE CASCADE,
    candidate_key   INTEGER NOT NULL,
    rank            INTEGER NOT NULL,
    total_score     REAL NOT NULL,
    signals_json    TEXT NOT NULL,
    PRIMARY KEY (dom_snapshot_id, dom_node_id, candidate_key)
);

CREATE TABLE IF NOT EXISTS dom_commit_eligibility (
    dom_snapshot_id INTEGER NOT NULL REFERENCES dom_snapshot(id) ON DELETE CASCADE,
    dom_node_id     INTEGER NOT NULL REFERENCES dom_node(id) ON DELETE CASCADE,
    eligible        INTEGER NOT NULL,
    reason          TEXT,
    PRIMARY KEY (dom_snapshot_id, dom_node_id)
);

-- ============================================================================
-- Schema version tracking
-- ============================================================================

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get::<_, i64>(0).map(|n| n > 0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

/// Apply any pending migrations in version order. Returns the number
/// applied.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                [migration.version],
            )?;

            applied += 1;
        }
    }

    Ok(applied)
}
