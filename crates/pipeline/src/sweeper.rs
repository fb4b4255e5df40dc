//! Periodic eviction of abandoned and long-finished import jobs.
//!
//! Runs on a fixed interval using `tokio::time::interval`. Each evicted job
//! also has its uploaded file deleted.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::ImportConfig;
use crate::job_store::JobStore;
use crate::uploads::remove_upload;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(jobs: Arc<JobStore>, config: Arc<ImportConfig>, cancel: CancellationToken) {
    tracing::info!(
        ttl_secs = config.job_ttl.as_secs(),
        retention_secs = config.terminal_retention.as_secs(),
        interval_secs = config.sweep_interval.as_secs(),
        "Import job sweeper started"
    );

    let mut interval = tokio::time::interval(config.sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Import job sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_once(&jobs, &config).await;
            }
        }
    }
}

/// Evict stale jobs and delete their files. Returns how many were evicted.
pub async fn sweep_once(jobs: &JobStore, config: &ImportConfig) -> usize {
    let evicted = jobs
        .sweep(Utc::now(), config.job_ttl, config.terminal_retention)
        .await;
    if evicted.is_empty() {
        tracing::debug!("Import sweep: nothing to evict");
        return 0;
    }

    for job in &evicted {
        if let Err(e) = remove_upload(&job.source_file_path).await {
            tracing::error!(
                job_id = %job.id,
                path = %job.source_file_path.display(),
                error = %e,
                "Import sweep: failed to delete uploaded file"
            );
        }
        tracing::info!(job_id = %job.id, status = %job.status, "Import sweep: evicted job");
    }
    evicted.len()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use psgc_core::entity::EntityType;
    use psgc_core::job::JobStatus;

    use super::*;
    use crate::uploads::UploadStorage;

    #[tokio::test]
    async fn expired_jobs_and_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(dir.path());
        let jobs = JobStore::default();

        let stale_path = storage.save(EntityType::Region, b"1,NCR,R1\n").await.unwrap();
        let stale = jobs.create(EntityType::Region, stale_path.clone()).await;

        let config = ImportConfig {
            job_ttl: Duration::ZERO,
            ..ImportConfig::default()
        };
        let finished_path = storage.save(EntityType::Region, b"2,CAR,R2\n").await.unwrap();
        let finished = jobs.create(EntityType::Region, finished_path.clone()).await;
        jobs.set_status(&finished, JobStatus::Processing, "started").await.unwrap();
        jobs.set_status(&finished, JobStatus::Error, "failed").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(sweep_once(&jobs, &config).await, 1);
        assert!(jobs.get(&stale).await.is_err());
        assert!(!stale_path.exists());

        // Terminal jobs follow the longer retention.
        assert!(jobs.get(&finished).await.is_ok());
        assert!(finished_path.exists());
    }

    #[tokio::test]
    async fn loop_stops_on_cancel() {
        let jobs = Arc::new(JobStore::default());
        let cancel = CancellationToken::new();
        let config = Arc::new(ImportConfig {
            sweep_interval: Duration::from_millis(10),
            ..ImportConfig::default()
        });

        let task = tokio::spawn(run(jobs, config, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
