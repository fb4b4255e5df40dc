//! Bounded worker pool for import jobs.
//!
//! [`DispatchHandle::enqueue`] never blocks the caller: job ids go onto an
//! unbounded channel and [`ImportDispatcher::run`] starts a worker for each
//! one as soon as a concurrency permit is free.

use std::sync::Arc;

use psgc_core::types::JobId;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ImportConfig;
use crate::job_store::JobStore;
use crate::runner::ImportRunner;
use crate::store::ReferenceStore;

/// Cloneable sender side of the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<JobId>,
}

/// The dispatcher has stopped and accepts no more jobs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Import dispatcher is not running")]
pub struct DispatcherClosed;

impl DispatchHandle {
    /// Queue a job for processing.
    pub fn enqueue(&self, job_id: JobId) -> Result<(), DispatcherClosed> {
        self.tx.send(job_id).map_err(|_| DispatcherClosed)
    }
}

/// Receives queued job ids and runs them with bounded concurrency.
pub struct ImportDispatcher {
    rx: mpsc::UnboundedReceiver<JobId>,
    runner: ImportRunner,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl ImportDispatcher {
    /// Build a dispatcher and the handle used to feed it.
    pub fn new(
        store: Arc<dyn ReferenceStore>,
        jobs: Arc<JobStore>,
        config: Arc<ImportConfig>,
    ) -> (DispatchHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let dispatcher = Self {
            rx,
            runner: ImportRunner::new(store, jobs, config),
            permits,
            tracker: TaskTracker::new(),
        };
        (DispatchHandle { tx }, dispatcher)
    }

    /// Dispatch jobs until `cancel` fires or every handle is dropped, then
    /// wait for in-flight workers to finish.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            max_concurrent_jobs = self.permits.available_permits(),
            "Import dispatcher started"
        );

        loop {
            let job_id = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Import dispatcher stopping");
                    break;
                }
                received = self.rx.recv() => match received {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %job_id, "Import dispatcher stopping before job start");
                    break;
                }
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tracing::debug!(job_id = %job_id, "Dispatching import job");
            let runner = self.runner.clone();
            self.tracker.spawn(async move {
                runner.run(job_id).await;
                drop(permit);
            });
        }

        self.rx.close();
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for running imports to finish");
        }
        self.tracker.wait().await;
        tracing::info!("Import dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use psgc_core::entity::EntityType;
    use psgc_core::job::{ImportJob, JobStatus};

    use super::*;
    use crate::store::MemoryReferenceStore;

    async fn wait_terminal(jobs: &JobStore, id: &str) -> ImportJob {
        for _ in 0..200 {
            let job = jobs.get(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    fn write_regions(dir: &std::path::Path, name: &str, first_id: i64) -> PathBuf {
        let path = dir.join(name);
        let content: String = (first_id..first_id + 5)
            .map(|i| format!("{i},Region {i},R{i}\n"))
            .collect();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn enqueued_jobs_run_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = Arc::new(JobStore::default());
        let config = Arc::new(ImportConfig {
            max_concurrent_jobs: 2,
            ..ImportConfig::default()
        });
        let (handle, dispatcher) =
            ImportDispatcher::new(Arc::new(MemoryReferenceStore::new()), Arc::clone(&jobs), config);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(dispatcher.run(cancel.clone()));

        let mut ids = Vec::new();
        for n in 0..4 {
            let path = write_regions(dir.path(), &format!("r{n}.csv"), n * 10 + 1);
            let id = jobs.create(EntityType::Region, path).await;
            jobs.set_status(&id, JobStatus::Processing, "queued").await.unwrap();
            handle.enqueue(id.clone()).unwrap();
            ids.push(id);
        }

        for id in &ids {
            let job = wait_terminal(&jobs, id).await;
            assert_eq!(job.status, JobStatus::Completed, "{}", job.message);
            assert_eq!(job.processed_rows, 5);
        }

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_fails_after_shutdown() {
        let jobs = Arc::new(JobStore::default());
        let (handle, dispatcher) = ImportDispatcher::new(
            Arc::new(MemoryReferenceStore::new()),
            jobs,
            Arc::new(ImportConfig::default()),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        dispatcher.run(cancel).await;

        assert_eq!(handle.enqueue("late".into()), Err(DispatcherClosed));
    }
}
