//! Whole-record retries at the caller boundary.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use tokio_retry::RetryIf;

use crate::error_handling::{get_retry_strategy, PipelineError};
use crate::record::Record;
use crate::storage::SqlPipeline;

/// Outcome of storing one record, with the number of retries it took.
#[derive(Debug)]
pub struct StoreResult {
    pub result: Result<Record, PipelineError>,
    pub retry_count: usize,
}

/// Processes a record, resubmitting it up to `attempts` more times while it
/// keeps failing with a transient error.
///
/// The pool already retries a transient failure once; this covers outages
/// that outlast that single retry. Any other error is returned at once.
pub async fn store_record(pipeline: &SqlPipeline, record: Record, attempts: usize) -> StoreResult {
    let attempt_count = AtomicUsize::new(0);

    let result = RetryIf::start(
        get_retry_strategy(attempts),
        || {
            attempt_count.fetch_add(1, Ordering::SeqCst);
            pipeline.process(record.clone())
        },
        |e: &PipelineError| {
            if e.is_transient() {
                warn!("Resubmitting {} after transient error: {}", record, e);
                true
            } else {
                false
            }
        },
    )
    .await;

    StoreResult {
        result,
        retry_count: attempt_count.load(Ordering::SeqCst).saturating_sub(1),
    }
}
