//! Asynchronous, progress-tracked bulk import of geographic reference data.
//!
//! An upload becomes an [`ImportJob`](psgc_core::job::ImportJob) held in the
//! [`JobStore`]. Processing hands the job to the [`ImportDispatcher`], whose
//! workers stream the file through the [`parser`], resolve parents and
//! commit batches through the [`loader`], and report through the
//! [`progress`] tracker. The [`sweeper`] reclaims abandoned jobs.
//!
//! [`ImportService`] is the facade the HTTP layer drives.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job_store;
pub mod loader;
pub mod parser;
pub mod progress;
pub mod record;
pub mod runner;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod uploads;

pub use config::{ImportConfig, RowErrorPolicy};
pub use dispatcher::{DispatchHandle, DispatcherClosed, ImportDispatcher};
pub use error::{ImportError, JobStoreError, ServiceError, StoreError};
pub use job_store::JobStore;
pub use runner::{ImportRunner, ImportSummary};
pub use service::ImportService;
pub use store::{MemoryReferenceStore, PgReferenceStore, ReferenceStore};
pub use uploads::UploadStorage;
