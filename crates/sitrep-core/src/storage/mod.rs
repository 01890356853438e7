//! Storage Module
//!
//! SQLite-backed persistence behind a typed `Store` capability:
//! - Versioned migrations with a schema_version tracking table
//! - Foreign keys cascading from `dom_post` downward
//! - One transaction per coherent unit of work; idempotence guards on
//!   DOM ingest and context materialization

mod migrations;
mod store;

pub use migrations::{apply_migrations, Migration, MIGRATIONS};
pub use store::{
    CandidateRow, DomContextRow, DomIngest, DomNodeRecord, DomNodeStateRecord, EligibilityRow,
    EventRecord, HintRecord, IngestPostRecord, ItemRecord, LssEventWrite, LssPersistIds,
    LssRunRecord, LssWrite, MaterializeOutcome, NewIngestPost, Result, RoleRecord, SectionRecord,
    SeriesRecord, SnapshotRecord, SnapshotRowCounts, StorageError, Store,
};
