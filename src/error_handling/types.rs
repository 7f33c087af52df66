//! Error type definitions.
//!
//! This module defines the error types used throughout the pipeline, and the
//! event types counted by [`super::PipelineStats`].

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors raised while expanding, submitting or executing statements.
///
/// Backend failures never reach callers as raw `sqlx::Error`s: the backend
/// kind classifies them first into [`PipelineError::UniquenessConflict`],
/// [`PipelineError::TransientConnection`] or [`PipelineError::Backend`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A destructive statement was expanded for a record lacking a value
    /// for one of its unique fields.
    #[error("Record missing value for unique field \"{field}\" but index must be present. Record is: {record}")]
    MissingIdentityField {
        /// Rendering of the offending record.
        record: String,
        /// The unique field without a value.
        field: String,
    },

    /// The template references a placeholder outside the supported set.
    #[error("Invalid placeholder in template: \"{0}\"")]
    InvalidPlaceholder(String),

    /// No template is registered for the requested operation.
    #[error("No statement template registered for operation \"{0}\"")]
    UnknownOperation(String),

    /// A value was set for a field the record's schema does not declare.
    #[error("Record type \"{record}\" has no field \"{field}\"")]
    UnknownField {
        /// Declared type name of the record.
        record: String,
        /// The undeclared field name.
        field: String,
    },

    /// The backend rejected an insert because of the identity constraint.
    #[error("Uniqueness conflict: {0}")]
    UniquenessConflict(#[source] sqlx::Error),

    /// Lost connection, server restart, deadlock or another condition that
    /// is expected to clear up after reconnecting.
    #[error("Transient connection error: {0}")]
    TransientConnection(#[source] sqlx::Error),

    /// Any other backend failure (syntax, types, permissions, closed pool).
    #[error("SQL error: {0}")]
    Backend(#[source] sqlx::Error),

    /// The configuration cannot be turned into a connection.
    #[error("Invalid database configuration: {0}")]
    Config(String),

    /// A statement was requested before `connect()` succeeded.
    #[error("Pipeline is not connected")]
    NotConnected,

    /// An input line is not a JSON object of scalar fields.
    #[error("Invalid record input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    /// A submitted record task panicked or was cancelled.
    #[error("Record task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Returns true for failures the resilient pool retries once.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::TransientConnection(_))
    }

    /// Returns true for identity constraint violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PipelineError::UniquenessConflict(_))
    }
}

/// Events counted while records flow through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum PipelineEvent {
    /// The insert statement succeeded.
    RecordInserted,
    /// The insert conflicted and the update fallback succeeded.
    RecordUpdated,
    /// The record's interaction failed for good.
    RecordFailed,
    /// An interaction hit a transient error and was run again.
    TransientRetry,
    /// A connection was closed after a transient error.
    ConnectionDiscarded,
}

impl std::fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineEvent {
    /// Returns a human-readable string representation of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineEvent::RecordInserted => "Records inserted",
            PipelineEvent::RecordUpdated => "Records updated after conflict",
            PipelineEvent::RecordFailed => "Records failed",
            PipelineEvent::TransientRetry => "Transient retries",
            PipelineEvent::ConnectionDiscarded => "Connections discarded",
        }
    }
}
