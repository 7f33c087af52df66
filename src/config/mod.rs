//! Pipeline configuration and constants.
//!
//! This module provides:
//! - Configuration constants (pool sizes, timeouts, retry backoff)
//! - The database configuration consumed by the library
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{DatabaseConfig, LogFormat, LogLevel, Opt};
