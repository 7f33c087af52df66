//! NULL handling against a PostgreSQL server.
//!
//! Runs only when `SQL_PIPELINE_TEST_PG_DATABASE` names a database to use.
//! `SQL_PIPELINE_TEST_PG_HOST`, `SQL_PIPELINE_TEST_PG_USER` and
//! `SQL_PIPELINE_TEST_PG_PASSWORD` are read when set.

use std::sync::Arc;

use sqlx::Row;

use sql_pipeline::{BackendKind, DatabaseConfig, RecordSchema, SqlPipeline, Value};

const SCORES_DDL: &str = "DROP TABLE IF EXISTS pipeline_scores; \
     CREATE TABLE pipeline_scores (id INTEGER PRIMARY KEY, score INTEGER, label TEXT)";

fn postgres_config() -> Option<DatabaseConfig> {
    let database = std::env::var("SQL_PIPELINE_TEST_PG_DATABASE").ok()?;
    Some(DatabaseConfig {
        backend: BackendKind::Postgres,
        database: Some(database),
        host: std::env::var("SQL_PIPELINE_TEST_PG_HOST").ok(),
        username: std::env::var("SQL_PIPELINE_TEST_PG_USER").ok(),
        password: std::env::var("SQL_PIPELINE_TEST_PG_PASSWORD").ok(),
        ..DatabaseConfig::default()
    })
}

#[tokio::test]
async fn test_null_into_integer_column() {
    let Some(config) = postgres_config() else {
        eprintln!("SQL_PIPELINE_TEST_PG_DATABASE not set, skipping");
        return;
    };
    let pipeline = SqlPipeline::new(config)
        .on_connect(|p| async move { p.execute_raw(SCORES_DDL).await.map(|_| ()) });
    pipeline.connect().await.expect("Failed to connect to PostgreSQL");

    let schema = Arc::new(
        RecordSchema::new("Score")
            .with_table("pipeline_scores")
            .unique_field("id")
            .field("score")
            .field("label"),
    );
    let record = |score: Value| {
        schema
            .record()
            .with("id", 2)
            .and_then(|r| r.with("score", score))
            .and_then(|r| r.with("label", Value::Null))
            .expect("Score declares id, score and label")
    };

    pipeline
        .process(record(Value::Null))
        .await
        .expect("NULL insert into INTEGER column");
    // The update fallback binds NULL too
    pipeline
        .process(record(Value::Null))
        .await
        .expect("NULL update of INTEGER column");

    let rows = pipeline
        .query_raw(
            "SELECT COUNT(*) AS n FROM pipeline_scores \
             WHERE id = 2 AND score IS NULL AND label IS NULL",
        )
        .await
        .expect("count");
    assert_eq!(rows[0].try_get::<i64, _>("n").ok(), Some(1));

    pipeline
        .execute_raw("DROP TABLE pipeline_scores")
        .await
        .expect("drop table");
    pipeline.shutdown().await;
}
