//! JSON-lines ingestion.
//!
//! Reads one JSON object per line, turns each into a record of the declared
//! schema and submits it to the pipeline. Records are stored concurrently,
//! at most one per pooled connection at a time.

mod parse;
mod retry;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::LOGGING_INTERVAL;
use crate::initialization::init_semaphore;
use crate::record::RecordSchema;
use crate::storage::SqlPipeline;

pub use parse::parse_record;
pub use retry::{store_record, StoreResult};

/// What to ingest and how.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// JSON-lines file, or `-` for stdin
    pub file: PathBuf,
    pub schema: Arc<RecordSchema>,
    /// Records in flight at once
    pub concurrency: usize,
    /// Whole-record resubmissions after transient failures
    pub retry_attempts: usize,
}

/// Results of an ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Non-blank, non-comment lines read
    pub total: usize,
    pub succeeded: usize,
    /// Lines that could not be parsed plus records that could not be stored
    pub failed: usize,
    pub elapsed_seconds: f64,
}

/// Logs progress information about record processing.
fn log_progress(start_time: Instant, completed: &AtomicUsize, failed: &AtomicUsize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let completed = completed.load(Ordering::SeqCst);
    let failed = failed.load(Ordering::SeqCst);
    let rate = if elapsed_secs > 0.0 {
        (completed + failed) as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Stored {} records ({} failed) in {:.2} seconds (~{:.2} records/sec)",
        completed, failed, elapsed_secs, rate
    );
}

/// Ingests the configured file (or stdin) into a connected pipeline.
///
/// # Errors
///
/// Returns an error if the input cannot be opened. Bad lines and failed
/// records are counted in the report, not returned.
pub async fn run_ingest(pipeline: &SqlPipeline, options: &IngestOptions) -> Result<IngestReport> {
    if options.file.as_os_str() == "-" {
        info!("Reading records from stdin");
        let reader = BufReader::new(tokio::io::stdin());
        ingest_lines(pipeline, options, reader).await
    } else {
        let reader = open_input(&options.file).await?;
        ingest_lines(pipeline, options, reader).await
    }
}

async fn open_input(path: &Path) -> Result<BufReader<tokio::fs::File>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Ingests every line of `reader`.
pub async fn ingest_lines<R>(
    pipeline: &SqlPipeline,
    options: &IngestOptions,
    reader: R,
) -> Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
{
    let start_time = Instant::now();
    let semaphore = init_semaphore(options.concurrency);
    let total = Arc::new(AtomicUsize::new(0));
    let succeeded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let progress_task = {
        let succeeded = Arc::clone(&succeeded);
        let failed = Arc::clone(&failed);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOGGING_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                log_progress(start_time, &succeeded, &failed);
            }
        })
    };

    let mut tasks = FuturesUnordered::new();
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read line from input: {e}");
                break;
            }
        };
        line_number += 1;

        let Some(trimmed) = parse::significant(&line) else {
            continue;
        };
        total.fetch_add(1, Ordering::SeqCst);

        let record = match parse_record(trimmed, &options.schema) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", line_number, e);
                failed.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Semaphore closed, skipping line {}", line_number);
                failed.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let pipeline = pipeline.clone();
        let succeeded = Arc::clone(&succeeded);
        let failed = Arc::clone(&failed);
        let retry_attempts = options.retry_attempts;
        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            let stored = store_record(&pipeline, record, retry_attempts).await;
            match stored.result {
                Ok(_) => {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::SeqCst);
                    warn!(
                        "Failed to store line {} after {} retries: {}",
                        line_number, stored.retry_count, e
                    );
                }
            }
        }));
    }

    while let Some(task_result) = tasks.next().await {
        if let Err(join_error) = task_result {
            failed.fetch_add(1, Ordering::SeqCst);
            warn!("Record task panicked: {:?}", join_error);
        }
    }

    progress_task.abort();
    log_progress(start_time, &succeeded, &failed);

    Ok(IngestReport {
        total: total.load(Ordering::SeqCst),
        succeeded: succeeded.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
        elapsed_seconds: start_time.elapsed().as_secs_f64(),
    })
}
