//! Process-level initialization.
//!
//! Logger setup and the concurrency limiter used by the ingest loop.

mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

pub use logger::init_logger_with;

/// Initializes a semaphore for controlling concurrency.
///
/// Limits how many records are in flight at once; the ingest loop sizes it
/// to the connection pool so submitted records never queue on `acquire`.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count.max(1)))
}
