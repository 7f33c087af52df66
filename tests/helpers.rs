// Shared test helpers for database setup and test data creation.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::Arc;

use sql_pipeline::{DatabaseConfig, Record, RecordSchema, SqlPipeline};
use tempfile::TempDir;

#[allow(dead_code)] // Used by other test files
pub const ITEMS_DDL: &str =
    "CREATE TABLE IF NOT EXISTS items (id INTEGER NOT NULL, name TEXT, UNIQUE (id))";

/// Creates a SQLite config backed by a file in a fresh temp directory.
/// The directory must outlive the pipeline, so it is returned alongside.
pub fn sqlite_config() -> (DatabaseConfig, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("items.db");
    (
        DatabaseConfig::sqlite(path.to_string_lossy().to_string()),
        dir,
    )
}

/// Creates a connected pipeline whose `items` table is created on connect.
#[allow(dead_code)] // Used by other test files
pub async fn connected_pipeline() -> (SqlPipeline, TempDir) {
    let (config, dir) = sqlite_config();
    let pipeline = SqlPipeline::new(config)
        .on_connect(|p| async move { p.execute_raw(ITEMS_DDL).await.map(|_| ()) });
    pipeline
        .connect()
        .await
        .expect("Failed to connect pipeline");
    (pipeline, dir)
}

#[allow(dead_code)] // Used by other test files
pub fn item_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new("Item")
            .with_table("items")
            .unique_field("id")
            .field("name"),
    )
}

#[allow(dead_code)] // Used by other test files
pub fn item(id: i64, name: &str) -> Record {
    item_schema()
        .record()
        .with("id", id)
        .and_then(|r| r.with("name", name))
        .expect("Item declares id and name")
}
