//! sql_pipeline library: templated, retrying upserts into SQL databases
//!
//! This library turns flat records into backend-specific prepared statements
//! and writes them through a connection pool that survives transient
//! connection loss. An insert that hits the record's unique fields falls
//! back to an update in the same transaction.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sql_pipeline::{DatabaseConfig, RecordSchema, SqlPipeline};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = SqlPipeline::new(DatabaseConfig::sqlite("pages.db")).on_connect(|p| async move {
//!     p.execute_raw("CREATE TABLE IF NOT EXISTS pages (url TEXT PRIMARY KEY, status INTEGER)")
//!         .await
//!         .map(|_| ())
//! });
//! pipeline.connect().await?;
//!
//! let schema = Arc::new(RecordSchema::new("pages").unique_field("url").field("status"));
//! let page = schema.record().with("url", "https://example.com")?.with("status", 200)?;
//! pipeline.process(page).await?;
//!
//! pipeline.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod backend;
pub mod config;
mod error_handling;
pub mod ingest;
pub mod initialization;
pub mod record;
pub mod storage;
pub mod template;

// Re-export public API
pub use backend::{BackendKind, BackendProfile, Operation, ParamStyle};
pub use config::{DatabaseConfig, LogFormat, LogLevel, Opt};
pub use error_handling::{
    classify_sqlx_error, InitializationError, PipelineError, PipelineEvent, PipelineStats,
};
pub use ingest::{run_ingest, IngestOptions, IngestReport};
pub use record::{Record, RecordSchema, Value};
pub use storage::{ResilientPool, SqlPipeline};
pub use template::{expand, Statement};
