//! Statement execution with logging.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, error, log_enabled, trace, Level};
use sqlx::any::AnyRow;
use sqlx::AnyConnection;

use crate::backend::BackendKind;
use crate::error_handling::PipelineError;
use crate::record::{Record, RecordSchema};
use crate::template::Statement;

use super::binding::{bind_params, decode_row};

/// Executes expanded statements on a connection.
///
/// Only the parameterized form is ever sent to the backend. The literal form
/// (values substituted) is logged for every failure, and for every executed
/// statement when `debug` is set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatementRunner {
    pub backend: BackendKind,
    pub debug: bool,
}

impl StatementRunner {
    /// Runs a statement and returns the number of affected rows.
    pub async fn execute(
        &self,
        conn: &mut AnyConnection,
        statement: &Statement,
    ) -> Result<u64, PipelineError> {
        let query = bind_params(sqlx::query(statement.sql()), statement.params());
        match query.execute(&mut *conn).await {
            Ok(result) => {
                self.log_executed(statement);
                Ok(result.rows_affected())
            }
            Err(e) => Err(self.failed(statement, e)),
        }
    }

    /// Runs a query and decodes every row into a record of `schema`.
    pub async fn fetch(
        &self,
        conn: &mut AnyConnection,
        statement: &Statement,
        schema: &Arc<RecordSchema>,
    ) -> Result<Vec<Record>, PipelineError> {
        let query = bind_params(sqlx::query(statement.sql()), statement.params());
        let rows = match query.fetch_all(&mut *conn).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.failed(statement, e)),
        };
        self.log_executed(statement);
        rows.iter().map(|row| decode_row(row, schema)).collect()
    }

    /// Runs unparameterized SQL, possibly several statements.
    pub async fn execute_raw(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
    ) -> Result<u64, PipelineError> {
        match sqlx::Executor::execute(&mut *conn, sql).await {
            Ok(result) => {
                debug!("Executed: {}", sql);
                Ok(result.rows_affected())
            }
            Err(e) => {
                let err = self.backend.classify(e);
                error!("Failed: {} ({})", sql, err);
                Err(err)
            }
        }
    }

    /// Runs unparameterized SQL and returns its rows as the driver decoded
    /// them.
    pub async fn fetch_raw(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
    ) -> Result<Vec<AnyRow>, PipelineError> {
        match sqlx::Executor::fetch_all(&mut *conn, sql).await {
            Ok(rows) => {
                debug!("Executed: {} ({} rows)", sql, rows.len());
                Ok(rows)
            }
            Err(e) => {
                let err = self.backend.classify(e);
                error!("Failed: {} ({})", sql, err);
                Err(err)
            }
        }
    }

    fn log_executed(&self, statement: &Statement) {
        if self.debug {
            debug!("Executed: {}", statement.literal());
        } else if log_enabled!(Level::Trace) {
            trace!("Executed: {} {:?}", statement.sql(), statement.params());
        }
    }

    fn failed(&self, statement: &Statement, e: sqlx::Error) -> PipelineError {
        let err = self.backend.classify(e);
        if err.is_conflict() {
            // Recovered by the caller, so not an error yet
            debug!("Conflict: {} ({})", statement.literal(), err);
        } else {
            error!("Failed: {} ({})", statement.literal(), err);
        }
        err
    }
}

/// Runs the statements of the upsert protocol.
///
/// [`StatementRunner`] is the only production implementation.
pub(crate) trait StatementExecutor: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn execute_statement<'a>(
        &'a self,
        conn: &'a mut AnyConnection,
        statement: &'a Statement,
    ) -> BoxFuture<'a, Result<u64, PipelineError>>;
}

impl StatementExecutor for StatementRunner {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn execute_statement<'a>(
        &'a self,
        conn: &'a mut AnyConnection,
        statement: &'a Statement,
    ) -> BoxFuture<'a, Result<u64, PipelineError>> {
        Box::pin(self.execute(conn, statement))
    }
}
