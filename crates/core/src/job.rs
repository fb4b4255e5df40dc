//! Import job snapshots and the job status state machine.
//!
//! ```text
//! pending ──► processing ──► completed
//!    │             │
//!    └─────────────┴──────► error
//! ```
//!
//! `completed` and `error` are terminal. A failed import is retried by
//! uploading the file again, which creates a new job.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// `completed` and `error` have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether `self → next` is a legal forward transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Error)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Row errors
// ---------------------------------------------------------------------------

/// A data row that was skipped, with its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: u64,
    pub reason: String,
}

impl RowError {
    pub fn new(line: u64, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Job snapshot
// ---------------------------------------------------------------------------

/// A whole, consistent view of one import job.
///
/// The job store hands out clones of this struct, so a poller never observes
/// a record that is halfway through an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: JobId,
    pub entity_type: EntityType,
    pub status: JobStatus,
    pub total_rows: u64,
    pub processed_rows: u64,
    /// Exact number of rows skipped by validation.
    pub failed_rows: u64,
    pub progress_percent: u8,
    pub message: String,
    /// Recorded row errors; capped, so may be shorter than `failed_rows`.
    pub row_errors: Vec<RowError>,
    #[serde(skip_serializing)]
    pub source_file_path: PathBuf,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportJob {
    /// A freshly stored upload that has not started processing.
    pub fn new(id: JobId, entity_type: EntityType, source_file_path: PathBuf, now: Timestamp) -> Self {
        Self {
            id,
            entity_type,
            status: JobStatus::Pending,
            total_rows: 0,
            processed_rows: 0,
            failed_rows: 0,
            progress_percent: 0,
            message: format!("Upload of {} received", entity_type.label()),
            row_errors: Vec::new(),
            source_file_path,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Error));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for next in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Error.can_transition_to(next));
        }
    }

    #[test]
    fn backwards_and_skipping_transitions_are_rejected() {
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn new_job_is_pending_and_empty() {
        let now = chrono::Utc::now();
        let job = ImportJob::new("j1".into(), EntityType::Region, PathBuf::from("/tmp/x.csv"), now);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.processed_rows, 0);
        assert_eq!(job.progress_percent, 0);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.message.contains("regions"));
    }

    #[test]
    fn snapshot_does_not_serialize_file_path() {
        let job = ImportJob::new(
            "j1".into(),
            EntityType::Barangay,
            PathBuf::from("/srv/uploads/secret.csv"),
            chrono::Utc::now(),
        );
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("source_file_path").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["entity_type"], "barangay");
    }
}
