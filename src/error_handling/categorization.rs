//! Backend error categorization and caller-side retry strategy.
//!
//! Drivers report failures as `sqlx::Error`. Before they reach the
//! orchestrator they are sorted into uniqueness conflicts, transient
//! connection conditions and everything else, using per-backend code tables.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use crate::backend::BackendKind;

use super::types::PipelineError;

/// SQLite primary result codes that clear up on retry.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// MySQL error numbers that clear up after reconnecting or restarting the
/// transaction.
const MYSQL_TRANSIENT_NUMBERS: [u16; 4] = [
    2006, // MySQL server has gone away
    2013, // Lost connection to MySQL server during query
    1213, // Deadlock found when trying to get lock; try restarting transaction
    1205, // Lock wait timeout exceeded; try restarting transaction
];

/// Creates an exponential backoff retry strategy for whole-record retries.
///
/// Used at the caller boundary (the ingest loop), never inside the
/// orchestrator. The iterator is limited to `attempts` delays.
pub fn get_retry_strategy(attempts: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(attempts)
}

/// Returns true if a backend error code is in the transient table for the
/// backend.
///
/// Codes are what `DatabaseError::code()` reports: the extended result code
/// for SQLite, the SQLSTATE for PostgreSQL and MySQL.
pub fn is_transient_code(backend: BackendKind, code: &str) -> bool {
    match backend {
        BackendKind::Sqlite => code
            .parse::<i64>()
            .map(|extended| matches!(extended & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        BackendKind::Postgres => {
            matches!(code, "40001" | "40P01" | "57P01" | "57P02" | "57P03")
                || code.starts_with("08")
        }
        BackendKind::Mysql => matches!(code, "40001" | "08S01"),
    }
}

/// Returns true for codes reporting an identity constraint violation, for
/// drivers that do not map them to `ErrorKind::UniqueViolation`.
fn is_unique_code(backend: BackendKind, code: &str) -> bool {
    match backend {
        // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
        BackendKind::Sqlite => matches!(code, "2067" | "1555"),
        BackendKind::Postgres => code == "23505",
        BackendKind::Mysql => false,
    }
}

/// Sorts a driver error into the pipeline's error taxonomy.
pub fn classify_sqlx_error(backend: BackendKind, error: sqlx::Error) -> PipelineError {
    match &error {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                return PipelineError::UniquenessConflict(error);
            }
            if let Some(mysql_err) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                if mysql_err.number() == 1062 {
                    return PipelineError::UniquenessConflict(error);
                }
                if MYSQL_TRANSIENT_NUMBERS.contains(&mysql_err.number()) {
                    return PipelineError::TransientConnection(error);
                }
            }
            match db_err.code() {
                Some(code) if is_unique_code(backend, &code) => {
                    PipelineError::UniquenessConflict(error)
                }
                Some(code) if is_transient_code(backend, &code) => {
                    PipelineError::TransientConnection(error)
                }
                _ => PipelineError::Backend(error),
            }
        }
        sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed => {
            PipelineError::TransientConnection(error)
        }
        _ => PipelineError::Backend(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_retry_strategy_initial_delay() {
        let mut strategy = get_retry_strategy(3);
        let first_delay = strategy.next().expect("strategy yields a first delay");

        let expected_ms = crate::config::RETRY_INITIAL_DELAY_MS as u128;
        assert!(
            first_delay.as_millis() >= expected_ms,
            "Expected delay >= {}ms, got {}ms",
            expected_ms,
            first_delay.as_millis()
        );
    }

    #[test]
    fn test_get_retry_strategy_max_delay() {
        let max_delay_ms = (crate::config::RETRY_MAX_DELAY_SECS * 1000) as u128;
        for delay in get_retry_strategy(10) {
            assert!(
                delay.as_millis() <= max_delay_ms,
                "Delay {}ms exceeds max {}ms",
                delay.as_millis(),
                max_delay_ms
            );
        }
    }

    #[test]
    fn test_get_retry_strategy_attempts() {
        assert_eq!(get_retry_strategy(4).count(), 4);
        assert_eq!(get_retry_strategy(0).count(), 0);
    }

    #[test]
    fn test_sqlite_transient_codes() {
        assert!(is_transient_code(BackendKind::Sqlite, "5"));
        assert!(is_transient_code(BackendKind::Sqlite, "6"));
        // SQLITE_BUSY_SNAPSHOT is an extended SQLITE_BUSY
        assert!(is_transient_code(BackendKind::Sqlite, "517"));
        assert!(!is_transient_code(BackendKind::Sqlite, "2067"));
        assert!(!is_transient_code(BackendKind::Sqlite, "not-a-number"));
    }

    #[test]
    fn test_postgres_transient_codes() {
        assert!(is_transient_code(BackendKind::Postgres, "40P01"));
        assert!(is_transient_code(BackendKind::Postgres, "40001"));
        assert!(is_transient_code(BackendKind::Postgres, "57P01"));
        assert!(is_transient_code(BackendKind::Postgres, "08006"));
        assert!(!is_transient_code(BackendKind::Postgres, "23505"));
        assert!(!is_transient_code(BackendKind::Postgres, "42601"));
    }

    #[test]
    fn test_mysql_transient_codes() {
        assert!(is_transient_code(BackendKind::Mysql, "40001"));
        assert!(is_transient_code(BackendKind::Mysql, "08S01"));
        assert!(!is_transient_code(BackendKind::Mysql, "23000"));
    }

    #[test]
    fn test_classify_connection_level_errors() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert!(classify_sqlx_error(BackendKind::Mysql, io).is_transient());

        let protocol = sqlx::Error::Protocol("unexpected end of stream".to_string());
        assert!(classify_sqlx_error(BackendKind::Postgres, protocol).is_transient());

        assert!(classify_sqlx_error(BackendKind::Sqlite, sqlx::Error::WorkerCrashed).is_transient());
    }

    #[test]
    fn test_classify_other_errors_are_fatal() {
        let closed = classify_sqlx_error(BackendKind::Sqlite, sqlx::Error::PoolClosed);
        assert!(matches!(closed, PipelineError::Backend(_)));

        let missing = classify_sqlx_error(BackendKind::Postgres, sqlx::Error::RowNotFound);
        assert!(matches!(missing, PipelineError::Backend(_)));
    }
}
