//! Insert with update fallback.
//!
//! One record is written in one interaction:
//!
//! 1. expand `insert` and run it inside a savepoint
//! 2. on a uniqueness conflict roll back to the savepoint, expand `update`
//!    and run it in the same transaction
//! 3. anything else propagates without an update
//!
//! The savepoint keeps backends that abort the whole transaction on a failed
//! statement (PostgreSQL) usable for the update.

use log::{debug, error};
use sqlx::AnyConnection;
use sqlx::Connection;

use crate::backend::{BackendProfile, Operation};
use crate::error_handling::PipelineError;
use crate::record::Record;

use super::statement::StatementExecutor;

/// Which branch of the protocol wrote the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Inserted,
    Updated,
}

pub(crate) async fn upsert<R: StatementExecutor>(
    conn: &mut AnyConnection,
    profile: &BackendProfile,
    runner: &R,
    record: &Record,
) -> Result<UpsertOutcome, PipelineError> {
    let insert = profile.expand(Operation::Insert.as_str(), record)?;
    let backend = runner.backend();
    let classify = |e| backend.classify(e);

    let mut savepoint = conn.begin().await.map_err(classify)?;
    match runner.execute_statement(&mut *savepoint, &insert).await {
        Ok(_) => {
            savepoint.commit().await.map_err(classify)?;
            Ok(UpsertOutcome::Inserted)
        }
        Err(e) if e.is_conflict() => {
            savepoint.rollback().await.map_err(classify)?;
            debug!("{} already stored, updating", record);
            update(conn, profile, runner, record).await?;
            Ok(UpsertOutcome::Updated)
        }
        Err(e) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                debug!("Savepoint rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn update<R: StatementExecutor>(
    conn: &mut AnyConnection,
    profile: &BackendProfile,
    runner: &R,
    record: &Record,
) -> Result<u64, PipelineError> {
    let update = profile.expand(Operation::Update.as_str(), record)?;
    runner.execute_statement(conn, &update).await.inspect_err(|e| {
        if e.is_transient() {
            error!("Update fallback for {} lost its connection: {}", record, e);
        }
    })
}
