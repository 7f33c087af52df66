//! Configuration constants.
//!
//! Defaults for the connection pool, backend endpoints and the caller-side
//! retry strategy.

use std::time::Duration;

/// Default number of pooled connections (one interaction runs per connection)
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Default time to wait for a free pooled connection, in seconds
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
/// SQLite database used when no database path is configured
pub const SQLITE_MEMORY_DATABASE: &str = ":memory:";
/// Host used for client-server backends when none is configured
pub const DEFAULT_HOST: &str = "localhost";
pub const POSTGRES_DEFAULT_PORT: u16 = 5432;
pub const MYSQL_DEFAULT_PORT: u16 = 3306;

// Retry strategy (caller boundary only)
/// Initial delay in milliseconds before the first whole-record retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 15;

/// How often the ingest loop logs progress
pub const LOGGING_INTERVAL: Duration = Duration::from_secs(5);
