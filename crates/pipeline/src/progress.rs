//! Progress reporting for a running import.

use std::sync::Arc;

use psgc_core::entity::EntityType;
use psgc_core::job::ImportJob;
use psgc_core::types::JobId;

use crate::error::JobStoreError;
use crate::job_store::JobStore;

/// Whole-number percentage of `processed` over `total`, rounded to nearest.
///
/// Returns 0 when `total` is 0 and never exceeds 100.
pub fn progress_percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let processed = processed.min(total) as u128;
    let total = total as u128;
    ((processed * 100 + total / 2) / total) as u8
}

/// Publishes per-batch progress of one job to the [`JobStore`].
pub struct ProgressTracker {
    jobs: Arc<JobStore>,
    job_id: JobId,
    entity_type: EntityType,
    total: u64,
    processed: u64,
}

impl ProgressTracker {
    pub fn new(jobs: Arc<JobStore>, job_id: JobId, entity_type: EntityType, total: u64) -> Self {
        Self {
            jobs,
            job_id,
            entity_type,
            total,
            processed: 0,
        }
    }

    /// Publish the starting snapshot (0 of `total`).
    pub async fn start(&self) -> Result<ImportJob, JobStoreError> {
        self.publish().await
    }

    /// Add `committed` rows to the processed count and publish.
    pub async fn advance(&mut self, committed: u64) -> Result<ImportJob, JobStoreError> {
        self.processed = (self.processed + committed).min(self.total);
        self.publish().await
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    async fn publish(&self) -> Result<ImportJob, JobStoreError> {
        let message = format!(
            "Imported {} of {} {}",
            self.processed,
            self.total,
            self.entity_type.label()
        );
        self.jobs
            .update_progress(&self.job_id, self.processed, self.total, message)
            .await
    }
}
