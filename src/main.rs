//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `sql_pipeline` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use sql_pipeline::initialization::init_logger_with;
use sql_pipeline::{run_ingest, IngestOptions, Opt, RecordSchema, SqlPipeline};

/// Declares the record type from the CLI: unique fields first, then the
/// regular fields, each in the order given.
fn schema_from(opt: &Opt) -> Result<Arc<RecordSchema>> {
    if opt.unique.is_empty() {
        bail!("At least one --unique field is required to upsert records");
    }
    let mut schema = RecordSchema::new(opt.type_name.clone());
    if let Some(table) = &opt.table {
        schema = schema.with_table(table.clone());
    }
    for name in &opt.unique {
        schema = schema.unique_field(name.clone());
    }
    for name in &opt.fields {
        schema = schema.field(name.clone());
    }
    Ok(Arc::new(schema))
}

async fn build_pipeline(opt: &Opt) -> Result<SqlPipeline> {
    let pipeline = SqlPipeline::new(opt.database_config());
    let Some(path) = &opt.setup_sql else {
        return Ok(pipeline);
    };

    let script: Arc<str> = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read setup SQL from {}", path.display()))?
        .into();
    info!("Setup SQL will run after connecting: {}", path.display());
    Ok(pipeline.on_connect(move |pipeline| {
        let script = Arc::clone(&script);
        async move { pipeline.execute_raw(&script).await.map(|_| ()) }
    }))
}

async fn run(opt: Opt) -> Result<()> {
    let schema = schema_from(&opt)?;
    let pipeline = build_pipeline(&opt).await?;
    pipeline
        .connect()
        .await
        .context("Failed to connect to database")?;

    let options = IngestOptions {
        file: opt.file.clone(),
        schema,
        concurrency: opt.max_connections as usize,
        retry_attempts: opt.retry_attempts,
    };
    let report = run_ingest(&pipeline, &options).await;
    pipeline.stats().log_summary();
    pipeline.shutdown().await;
    let report = report?;

    println!(
        "✅ Processed {} record{} ({} succeeded, {} failed) in {:.1}s",
        report.total,
        if report.total == 1 { "" } else { "s" },
        report.succeeded,
        report.failed,
        report.elapsed_seconds
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(opt).await {
        eprintln!("sql_pipeline error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
