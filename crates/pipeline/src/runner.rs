//! The per-job import worker.
//!
//! One runner invocation owns one job from `processing` to a terminal state:
//! precheck, pre-scan, then read, resolve, commit and report batch by batch.
//! Every failure ends up in the job's status and message; nothing escapes.

use std::path::PathBuf;
use std::sync::Arc;

use psgc_core::entity::EntityType;
use psgc_core::job::{JobStatus, RowError};
use psgc_core::types::JobId;

use crate::config::{ImportConfig, RowErrorPolicy};
use crate::error::{ImportError, JobStoreError};
use crate::job_store::JobStore;
use crate::loader::BatchLoader;
use crate::parser::{count_data_rows, CsvRowReader, ParsedRow, RowOutcome};
use crate::progress::ProgressTracker;
use crate::store::ReferenceStore;

/// Row counts of a finished import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
}

impl ImportSummary {
    fn message(&self, entity_type: EntityType) -> String {
        let mut message = format!(
            "Imported {} of {} {}",
            self.processed,
            self.total,
            entity_type.label()
        );
        if self.failed > 0 {
            message.push_str(&format!(" ({} rows skipped)", self.failed));
        }
        message
    }
}

/// Runs import jobs against a [`ReferenceStore`].
#[derive(Clone)]
pub struct ImportRunner {
    store: Arc<dyn ReferenceStore>,
    jobs: Arc<JobStore>,
    config: Arc<ImportConfig>,
}

impl ImportRunner {
    pub fn new(store: Arc<dyn ReferenceStore>, jobs: Arc<JobStore>, config: Arc<ImportConfig>) -> Self {
        Self { store, jobs, config }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Process one job to completion and record the outcome on the job.
    pub async fn run(&self, job_id: JobId) {
        tracing::info!(job_id = %job_id, "Import started");

        let outcome = self.execute(&job_id).await;
        let entity_type = match self.jobs.get(&job_id).await {
            Ok(job) => job.entity_type,
            Err(_) => {
                tracing::warn!(job_id = %job_id, "Import job removed while processing");
                return;
            }
        };

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    job_id = %job_id,
                    entity_type = %entity_type,
                    total = summary.total,
                    processed = summary.processed,
                    failed = summary.failed,
                    "Import completed"
                );
                self.finish(&job_id, JobStatus::Completed, summary.message(entity_type))
                    .await;
            }
            Err(ImportError::JobGone) => {
                tracing::warn!(job_id = %job_id, "Import job already finished, skipping");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, entity_type = %entity_type, error = %e, "Import failed");
                self.finish(&job_id, JobStatus::Error, e.to_string()).await;
            }
        }
    }

    async fn finish(&self, job_id: &str, status: JobStatus, message: String) {
        if let Err(e) = self.jobs.set_status(job_id, status, message).await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to record import outcome");
        }
    }

    async fn execute(&self, job_id: &str) -> Result<ImportSummary, ImportError> {
        let job = self.jobs.get(job_id).await.map_err(gone)?;
        match job.status {
            JobStatus::Pending => {
                self.jobs
                    .set_status(job_id, JobStatus::Processing, "Import started")
                    .await
                    .map_err(gone)?;
            }
            JobStatus::Processing => {}
            JobStatus::Completed | JobStatus::Error => {
                return Err(gone(JobStoreError::AlreadyFinished(job_id.to_string())));
            }
        }
        let entity_type = job.entity_type;
        let path = job.source_file_path;

        // A child level cannot load anything while its parent table is empty.
        if let Some(parent) = entity_type.parent() {
            if self.store.count(parent).await? == 0 {
                return Err(ImportError::missing_parent(entity_type, parent));
            }
        }

        let total = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || count_data_rows(&path, entity_type)).await??
        };
        if total == 0 {
            return Err(ImportError::NoDataRows);
        }
        tracing::debug!(job_id = %job_id, total, "Pre-scan finished");

        let mut tracker = ProgressTracker::new(Arc::clone(&self.jobs), job_id.to_string(), entity_type, total);
        tracker.start().await.map_err(gone)?;

        let loader = BatchLoader::new(Arc::clone(&self.store));
        let mut reader = open_reader(path, entity_type).await?;
        let mut failed = 0u64;

        loop {
            let (returned, chunk) = read_chunk(reader, self.config.batch_size).await?;
            reader = returned;
            let chunk = chunk?;
            if chunk.is_empty() {
                break;
            }

            let (valid, mut rejected) = split_outcomes(chunk);
            let resolved = loader.resolve_parents(valid).await?;
            rejected.extend(resolved.rejected);
            rejected.sort_by_key(|e| e.line);

            if let (RowErrorPolicy::Abort, Some(first)) = (self.config.row_error_policy, rejected.first()) {
                self.jobs
                    .record_row_errors(job_id, std::slice::from_ref(first))
                    .await
                    .map_err(gone)?;
                return Err(ImportError::RowRejected(first.clone()));
            }

            if !rejected.is_empty() {
                failed += rejected.len() as u64;
                self.jobs
                    .record_row_errors(job_id, &rejected)
                    .await
                    .map_err(gone)?;
            }

            if !resolved.rows.is_empty() {
                loader.commit(&resolved.rows).await?;
            }
            tracker
                .advance(resolved.rows.len() as u64)
                .await
                .map_err(gone)?;
        }

        if tracker.processed() == 0 {
            return Err(ImportError::NothingImported { failed });
        }

        Ok(ImportSummary {
            total,
            processed: tracker.processed(),
            failed,
        })
    }
}

/// The job disappeared or was finished by someone else.
fn gone(_: JobStoreError) -> ImportError {
    ImportError::JobGone
}

async fn open_reader(path: PathBuf, entity_type: EntityType) -> Result<CsvRowReader, ImportError> {
    tokio::task::spawn_blocking(move || CsvRowReader::open(&path, entity_type)).await?
}

/// Read one chunk on the blocking pool, handing the reader back afterwards.
async fn read_chunk(
    mut reader: CsvRowReader,
    max: usize,
) -> Result<(CsvRowReader, Result<Vec<RowOutcome>, ImportError>), ImportError> {
    let result = tokio::task::spawn_blocking(move || {
        let chunk = reader.next_chunk(max);
        (reader, chunk)
    })
    .await?;
    Ok(result)
}

fn split_outcomes(chunk: Vec<RowOutcome>) -> (Vec<ParsedRow>, Vec<RowError>) {
    let mut valid = Vec::with_capacity(chunk.len());
    let mut rejected = Vec::new();
    for outcome in chunk {
        match outcome {
            RowOutcome::Valid(row) => valid.push(row),
            RowOutcome::Invalid(error) => rejected.push(error),
        }
    }
    (valid, rejected)
}
