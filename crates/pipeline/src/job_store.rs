//! Concurrency-safe holder of import job snapshots.
//!
//! The outer map is write-locked only to insert or remove a job. Updates to
//! one job take that job's own lock, so unrelated jobs never contend, and a
//! reader always clones a complete snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use psgc_core::entity::EntityType;
use psgc_core::job::{ImportJob, JobStatus, RowError};
use psgc_core::types::{JobId, Timestamp};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::DEFAULT_MAX_RECORDED_ERRORS;
use crate::error::JobStoreError;
use crate::progress::progress_percent;

type JobCell = Arc<RwLock<ImportJob>>;

/// Keyed store of [`ImportJob`] snapshots.
///
/// Designed to be wrapped in `Arc` and shared between request handlers,
/// import workers and the sweeper.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobCell>>,
    max_recorded_errors: usize,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDED_ERRORS)
    }
}

impl JobStore {
    /// Create an empty store keeping at most `max_recorded_errors` row errors per job.
    pub fn new(max_recorded_errors: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            max_recorded_errors,
        }
    }

    /// Register a new `pending` job for an uploaded file and return its id.
    pub async fn create(&self, entity_type: EntityType, source_file_path: PathBuf) -> JobId {
        let id = Uuid::new_v4().simple().to_string();
        let job = ImportJob::new(id.clone(), entity_type, source_file_path, Utc::now());
        self.jobs
            .write()
            .await
            .insert(id.clone(), Arc::new(RwLock::new(job)));
        id
    }

    async fn cell(&self, id: &str) -> Result<JobCell, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))
    }

    /// Return a snapshot of a job.
    pub async fn get(&self, id: &str) -> Result<ImportJob, JobStoreError> {
        let cell = self.cell(id).await?;
        let job = cell.read().await.clone();
        Ok(job)
    }

    /// Record progress for a running job and return the new snapshot.
    ///
    /// `processed` is clamped to `total`; the percentage is derived from the
    /// two. Finished jobs reject further progress.
    pub async fn update_progress(
        &self,
        id: &str,
        processed: u64,
        total: u64,
        message: impl Into<String>,
    ) -> Result<ImportJob, JobStoreError> {
        let cell = self.cell(id).await?;
        let mut job = cell.write().await;
        if job.status.is_terminal() {
            return Err(JobStoreError::AlreadyFinished(id.to_string()));
        }

        let processed = processed.min(total);
        job.total_rows = total;
        job.processed_rows = processed;
        job.progress_percent = progress_percent(processed, total);
        job.message = message.into();
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// Move a job to `status`, enforcing the forward-only state machine.
    pub async fn set_status(
        &self,
        id: &str,
        status: JobStatus,
        message: impl Into<String>,
    ) -> Result<ImportJob, JobStoreError> {
        let cell = self.cell(id).await?;
        let mut job = cell.write().await;
        if !job.status.can_transition_to(status) {
            return Err(JobStoreError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        job.message = message.into();
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// Append skipped-row errors to a job.
    ///
    /// `failed_rows` always counts every error; the stored list stops growing
    /// once it reaches the configured cap.
    pub async fn record_row_errors(&self, id: &str, errors: &[RowError]) -> Result<(), JobStoreError> {
        if errors.is_empty() {
            return Ok(());
        }
        let cell = self.cell(id).await?;
        let mut job = cell.write().await;
        if job.status.is_terminal() {
            return Err(JobStoreError::AlreadyFinished(id.to_string()));
        }

        job.failed_rows += errors.len() as u64;
        let room = self.max_recorded_errors.saturating_sub(job.row_errors.len());
        job.row_errors.extend(errors.iter().take(room).cloned());
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a job, returning its final snapshot if it existed.
    ///
    /// Removing an unknown id is not an error.
    pub async fn delete(&self, id: &str) -> Option<ImportJob> {
        let cell = self.jobs.write().await.remove(id)?;
        let job = cell.read().await.clone();
        Some(job)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evict stale jobs and return their final snapshots.
    ///
    /// A non-terminal job is stale once `updated_at` is older than `ttl`; a
    /// terminal job once it is older than `terminal_retention`.
    pub async fn sweep(&self, now: Timestamp, ttl: Duration, terminal_retention: Duration) -> Vec<ImportJob> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let retention = chrono::Duration::from_std(terminal_retention).unwrap_or(chrono::Duration::MAX);

        let mut jobs = self.jobs.write().await;
        let mut stale_ids = Vec::new();
        for (id, cell) in jobs.iter() {
            let job = cell.read().await;
            let max_age = if job.status.is_terminal() { retention } else { ttl };
            let age = now.signed_duration_since(job.updated_at);
            if age > max_age {
                stale_ids.push(id.clone());
            }
        }

        let mut evicted = Vec::with_capacity(stale_ids.len());
        for id in stale_ids {
            if let Some(cell) = jobs.remove(&id) {
                evicted.push(cell.read().await.clone());
            }
        }
        evicted
    }
}
