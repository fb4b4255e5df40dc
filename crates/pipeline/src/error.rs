use psgc_core::entity::EntityType;
use psgc_core::intake::IntakeError;
use psgc_core::job::{JobStatus, RowError};
use psgc_core::types::JobId;
use thiserror::Error;

/// Failures of the in-memory job store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("Import job '{0}' not found")]
    NotFound(JobId),

    #[error("Import job '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Import job '{0}' has already finished")]
    AlreadyFinished(JobId),
}

/// Failures of the destination reference store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("A batch must contain rows of a single entity type")]
    MixedBatch,
}

/// Job-fatal conditions. The worker turns each into the job's error message.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read the uploaded file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse the uploaded file: {0}")]
    Csv(#[from] csv::Error),

    #[error("The uploaded file contains no data rows")]
    NoDataRows,

    #[error("Cannot import {entity}: no {parent} exist yet. Upload {parent} first")]
    MissingParent { entity: &'static str, parent: &'static str },

    #[error("Reference store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to write rows at lines {first_line}-{last_line}: {source}")]
    BatchFailed {
        first_line: u64,
        last_line: u64,
        #[source]
        source: StoreError,
    },

    #[error("Import stopped at {0}")]
    RowRejected(RowError),

    #[error("No rows were imported: all {failed} data rows failed validation")]
    NothingImported { failed: u64 },

    #[error("Import job was removed while processing")]
    JobGone,

    #[error("Import worker failed: {0}")]
    Worker(String),
}

impl ImportError {
    /// Precheck failure for a level whose parent table is empty.
    pub fn missing_parent(entity: EntityType, parent: EntityType) -> Self {
        Self::MissingParent {
            entity: entity.label(),
            parent: parent.label(),
        }
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

/// Failures surfaced by [`ImportService`](crate::ImportService) to callers.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("Upload '{0}' not found")]
    NotFound(JobId),

    #[error("Upload '{0}' is still being processed")]
    StillProcessing(JobId),

    #[error("Failed to store the uploaded file: {0}")]
    Storage(#[from] std::io::Error),

    #[error("The import service is shutting down")]
    Unavailable,
}
