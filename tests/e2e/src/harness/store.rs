//! Test Store Manager
//!
//! Provides isolated file-backed store instances for testing. Each test
//! gets its own temporary database, deleted when the manager drops.

use std::path::PathBuf;

use chrono::Utc;
use sitrep_core::{NewIngestPost, Store};
use tempfile::TempDir;

/// Manager for test databases.
///
/// Creates an isolated store per test to prevent interference; the
/// backing file goes away with the temp directory.
pub struct TestStore {
    pub store: Store,
    /// Kept alive to prevent premature deletion
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp directory");
        let db_path = temp_dir.path().join("records.db");
        let store = Store::open(&db_path).expect("open test store");
        Self {
            store,
            _temp_dir: temp_dir,
            db_path,
        }
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Ingest a post with boilerplate metadata; returns its id.
    pub fn ingest_post(&self, text: &str) -> i64 {
        let now = Utc::now();
        self.store
            .insert_ingest_post(&NewIngestPost {
                source: "telegram",
                publisher: "test-channel",
                source_post_id: &format!("{}", now.timestamp_nanos_opt().unwrap_or_default()),
                alias: Some("test"),
                lang: Some("en"),
                published_at: now,
                fetched_at: now,
                text,
            })
            .expect("insert ingest post")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
