//! Shared test helpers for storage module tests.
//!
//! Every fixture uses a SQLite file in a temporary directory rather than
//! `sqlite::memory:`, so that data survives a discarded connection.

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use futures::future::BoxFuture;
#[cfg(test)]
use sqlx::AnyConnection;
#[cfg(test)]
use tempfile::TempDir;

#[cfg(test)]
use crate::backend::BackendKind;

#[cfg(test)]
use crate::config::DatabaseConfig;
#[cfg(test)]
use crate::error_handling::{PipelineError, PipelineStats};
#[cfg(test)]
use crate::record::{Record, RecordSchema, Value};
#[cfg(test)]
use crate::storage::statement::{StatementExecutor, StatementRunner};
#[cfg(test)]
use crate::storage::{ResilientPool, SqlPipeline};
#[cfg(test)]
use crate::template::Statement;

/// Table used by the storage tests.
#[cfg(test)]
pub const ITEMS_DDL: &str =
    "CREATE TABLE IF NOT EXISTS items (id INTEGER NOT NULL, name TEXT, UNIQUE (id))";

/// Creates a database config for a fresh SQLite file.
#[cfg(test)]
pub fn create_test_config() -> (DatabaseConfig, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("pipeline.db");
    let config = DatabaseConfig::sqlite(path.to_string_lossy().to_string());
    (config, dir)
}

/// Creates a resilient pool over a fresh SQLite file with the `items` table.
#[cfg(test)]
pub async fn create_test_pool() -> (ResilientPool, TempDir) {
    let (config, dir) = create_test_config();
    let pool = ResilientPool::connect(&config, Arc::new(PipelineStats::new()))
        .await
        .expect("Failed to create test database pool");
    sqlx::raw_sql(ITEMS_DDL)
        .execute(pool.pool())
        .await
        .expect("Failed to create items table");
    (pool, dir)
}

/// Creates a connected pipeline whose on-connect hook creates `items`.
#[cfg(test)]
pub async fn create_test_pipeline() -> (SqlPipeline, TempDir) {
    let (config, dir) = create_test_config();
    let pipeline = SqlPipeline::new(config).on_connect(|pipeline| async move {
        pipeline.execute_raw(ITEMS_DDL).await.map(|_| ())
    });
    pipeline
        .connect()
        .await
        .expect("Failed to connect test pipeline");
    (pipeline, dir)
}

#[cfg(test)]
pub fn item_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new("Item")
            .with_table("items")
            .unique_field("id")
            .field("name"),
    )
}

#[cfg(test)]
pub fn item(id: i64, name: &str) -> Record {
    item_schema()
        .record()
        .with("id", id)
        .and_then(|r| r.with("name", name))
        .expect("Item declares id and name")
}

/// Reads the stored `name` for an id straight from the pool.
#[cfg(test)]
pub async fn stored_name(pool: &ResilientPool, id: i64) -> Option<Value> {
    sqlx::query_scalar::<_, Option<String>>("SELECT name FROM items WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool.pool())
        .await
        .expect("Failed to query items")
        .map(Value::from)
}

/// An I/O error as raised by a dropped connection.
#[cfg(test)]
pub fn io_error() -> sqlx::Error {
    sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ))
}

/// Runs statements normally, except that every `UPDATE` fails as if the
/// connection had dropped.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FailingUpdates(pub StatementRunner);

#[cfg(test)]
impl StatementExecutor for FailingUpdates {
    fn backend(&self) -> BackendKind {
        self.0.backend
    }

    fn execute_statement<'a>(
        &'a self,
        conn: &'a mut AnyConnection,
        statement: &'a Statement,
    ) -> BoxFuture<'a, Result<u64, PipelineError>> {
        if statement.sql().starts_with("UPDATE") {
            let err = self.0.backend.classify(io_error());
            Box::pin(async move { Err(err) })
        } else {
            self.0.execute_statement(conn, statement)
        }
    }
}
