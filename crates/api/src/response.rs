//! Response bodies for API handlers.
//!
//! Read endpoints use the `{ "data": ... }` envelope. The upload endpoint
//! speaks the import protocol instead: every body carries a `success` flag.

use psgc_core::job::{ImportJob, JobStatus, RowError};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

// ---------------------------------------------------------------------------
// Import protocol bodies
// ---------------------------------------------------------------------------

/// `{ "success": false, "message": ... }`
#[derive(Debug, Serialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Reply to `start_upload`.
#[derive(Debug, Serialize)]
pub struct UploadStarted {
    pub success: bool,
    pub upload_id: String,
}

/// Reply to `get_progress`.
#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub success: bool,
    pub status: JobStatus,
    pub progress: u8,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub failed_rows: u64,
    pub message: String,
}

impl From<ImportJob> for ProgressReport {
    fn from(job: ImportJob) -> Self {
        Self {
            success: true,
            status: job.status,
            progress: job.progress_percent,
            processed_rows: job.processed_rows,
            total_rows: job.total_rows,
            failed_rows: job.failed_rows,
            message: job.message,
        }
    }
}

/// Reply to `get_errors`.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub success: bool,
    pub failed_rows: u64,
    pub errors: Vec<RowError>,
}
