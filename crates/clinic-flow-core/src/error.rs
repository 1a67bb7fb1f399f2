//! Orchestrator errors.

use thiserror::Error;

use crate::db::DbError;

/// Errors raised by queue, sync, allocation and session operations.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Appointment source error: {0}")]
    Source(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl FlowError {
    pub(crate) fn entry_not_found(entry_id: &str) -> Self {
        FlowError::NotFound(format!("entry {}", entry_id))
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

impl From<rusqlite::Error> for FlowError {
    fn from(e: rusqlite::Error) -> Self {
        FlowError::Database(DbError::Sqlite(e))
    }
}
