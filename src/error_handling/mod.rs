//! Error handling and pipeline statistics.
//!
//! This module provides:
//! - Error type definitions ([`PipelineError`], [`InitializationError`])
//! - Classification of driver errors into conflicts, transient conditions
//!   and fatal errors
//! - Caller-side retry strategy configuration
//! - Pipeline statistics tracking

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{classify_sqlx_error, get_retry_strategy};
pub use stats::PipelineStats;
pub use types::{InitializationError, PipelineError, PipelineEvent};
