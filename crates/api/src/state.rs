use std::sync::Arc;

use psgc_pipeline::{ImportService, ReferenceStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Destination store for reference rows (PostgreSQL or in-memory).
    pub store: Arc<dyn ReferenceStore>,
    /// Upload intake, processing trigger, polling and cleanup.
    pub imports: Arc<ImportService>,
    /// Server configuration (read by middleware and extractors).
    pub config: Arc<ServerConfig>,
}
