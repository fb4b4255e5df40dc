//! The intake, process, poll and cleanup operations behind the upload API.

use std::sync::Arc;

use psgc_core::intake::{self, IntakeError};
use psgc_core::job::{ImportJob, JobStatus, RowError};
use psgc_core::types::JobId;

use crate::config::ImportConfig;
use crate::dispatcher::DispatchHandle;
use crate::error::{JobStoreError, ServiceError};
use crate::job_store::JobStore;
use crate::uploads::{remove_upload, UploadStorage};

/// Facade over the job store, upload storage and dispatcher.
pub struct ImportService {
    jobs: Arc<JobStore>,
    uploads: UploadStorage,
    dispatch: DispatchHandle,
    config: Arc<ImportConfig>,
}

impl ImportService {
    pub fn new(
        jobs: Arc<JobStore>,
        uploads: UploadStorage,
        dispatch: DispatchHandle,
        config: Arc<ImportConfig>,
    ) -> Self {
        Self {
            jobs,
            uploads,
            dispatch,
            config,
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Validate and store an upload, creating a `pending` job for it.
    ///
    /// Only the upload type, file name and size are checked here; content is
    /// validated when the job runs.
    pub async fn start_upload(
        &self,
        upload_type: &str,
        file_name: Option<&str>,
        data: &[u8],
    ) -> Result<JobId, ServiceError> {
        let entity_type = intake::parse_upload_type(upload_type)?;
        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(IntakeError::MissingFile)?;
        intake::validate_file_name(file_name)?;
        intake::validate_file_size(data.len(), self.config.max_upload_bytes)?;

        let path = self.uploads.save(entity_type, data).await?;
        let job_id = self.jobs.create(entity_type, path).await;

        tracing::info!(
            job_id = %job_id,
            entity_type = %entity_type,
            file_name,
            size = data.len(),
            "Upload received"
        );
        Ok(job_id)
    }

    /// Hand a `pending` job to the worker pool and return without waiting.
    ///
    /// Calling this for a job that has already started is a no-op.
    pub async fn process(&self, job_id: &str) -> Result<ImportJob, ServiceError> {
        let job = self.jobs.get(job_id).await.map_err(not_found)?;
        if job.status != JobStatus::Pending {
            tracing::debug!(job_id = %job_id, status = %job.status, "Process requested for started job");
            return Ok(job);
        }

        let job = match self
            .jobs
            .set_status(job_id, JobStatus::Processing, "Queued for import")
            .await
        {
            Ok(job) => job,
            // Another request started it first.
            Err(JobStoreError::InvalidTransition { .. }) => {
                return self.jobs.get(job_id).await.map_err(not_found);
            }
            Err(e) => return Err(not_found(e)),
        };

        if self.dispatch.enqueue(job_id.to_string()).is_err() {
            tracing::error!(job_id = %job_id, "Import dispatcher unavailable");
            let _ = self
                .jobs
                .set_status(job_id, JobStatus::Error, ServiceError::Unavailable.to_string())
                .await;
            return Err(ServiceError::Unavailable);
        }

        tracing::info!(job_id = %job_id, "Import queued");
        Ok(job)
    }

    /// Current snapshot of a job.
    pub async fn progress(&self, job_id: &str) -> Result<ImportJob, ServiceError> {
        self.jobs.get(job_id).await.map_err(not_found)
    }

    /// Exact failed-row count and the recorded row errors of a job.
    pub async fn errors(&self, job_id: &str) -> Result<(u64, Vec<RowError>), ServiceError> {
        let job = self.jobs.get(job_id).await.map_err(not_found)?;
        Ok((job.failed_rows, job.row_errors))
    }

    /// Delete a job and its uploaded file.
    ///
    /// Unknown ids succeed so the call can be repeated. A job that is still
    /// being processed is left alone.
    pub async fn cleanup(&self, job_id: &str) -> Result<(), ServiceError> {
        let job = match self.jobs.get(job_id).await {
            Ok(job) => job,
            Err(_) => {
                tracing::debug!(job_id = %job_id, "Cleanup of unknown job");
                return Ok(());
            }
        };
        if job.status == JobStatus::Processing {
            return Err(ServiceError::StillProcessing(job_id.to_string()));
        }

        // Keep the entry until the file is gone.
        if let Err(e) = remove_upload(&job.source_file_path).await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to remove uploaded file");
            return Err(e.into());
        }
        if let Some(job) = self.jobs.delete(job_id).await {
            tracing::info!(job_id = %job_id, status = %job.status, "Import job cleaned up");
        }
        Ok(())
    }
}

fn not_found(err: JobStoreError) -> ServiceError {
    match err {
        JobStoreError::NotFound(id)
        | JobStoreError::InvalidTransition { id, .. }
        | JobStoreError::AlreadyFinished(id) => ServiceError::NotFound(id),
    }
}
