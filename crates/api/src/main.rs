use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use psgc_api::config::ServerConfig;
use psgc_api::router::build_app_router;
use psgc_api::state::AppState;
use psgc_pipeline::{
    sweeper, ImportConfig, ImportDispatcher, ImportService, JobStore, MemoryReferenceStore,
    PgReferenceStore, ReferenceStore, UploadStorage,
};

/// `DATABASE_URL` value that selects the in-process store.
const MEMORY_DATABASE_URL: &str = "memory";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "psgc_api=debug,psgc_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let import_config = Arc::new(ImportConfig::from_env());
    let config = ServerConfig::from_env(import_config.max_upload_bytes);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        upload_dir = %import_config.upload_dir.display(),
        batch_size = import_config.batch_size,
        max_concurrent_jobs = import_config.max_concurrent_jobs,
        row_error_policy = import_config.row_error_policy.as_str(),
        "Loaded import configuration"
    );

    // --- Reference store ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store: Arc<dyn ReferenceStore> = if database_url == MEMORY_DATABASE_URL {
        tracing::warn!("Using in-memory reference store; imported data is lost on exit");
        Arc::new(MemoryReferenceStore::new())
    } else {
        let pool = psgc_db::create_pool(&database_url)
            .await
            .expect("Failed to connect to database");
        tracing::info!("Database connection pool created");

        psgc_db::health_check(&pool)
            .await
            .expect("Database health check failed");
        tracing::info!("Database health check passed");

        psgc_db::run_migrations(&pool)
            .await
            .expect("Failed to run database migrations");
        tracing::info!("Database migrations applied");

        Arc::new(PgReferenceStore::new(pool))
    };

    // --- Upload storage ---
    let uploads = UploadStorage::new(import_config.upload_dir.clone());
    uploads
        .ensure_dir()
        .await
        .expect("Failed to create upload directory");

    // --- Import pipeline ---
    let jobs = Arc::new(JobStore::new(import_config.max_recorded_errors));
    let cancel = CancellationToken::new();

    let (dispatch, dispatcher) =
        ImportDispatcher::new(Arc::clone(&store), Arc::clone(&jobs), Arc::clone(&import_config));
    let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.clone()));

    let sweeper_handle = tokio::spawn(sweeper::run(
        Arc::clone(&jobs),
        Arc::clone(&import_config),
        cancel.clone(),
    ));
    tracing::info!("Import services started (dispatcher, sweeper)");

    let imports = Arc::new(ImportService::new(
        jobs,
        uploads,
        dispatch,
        Arc::clone(&import_config),
    ));

    // --- App state ---
    let state = AppState {
        store,
        imports,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, dispatcher_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Running imports did not finish before shutdown timeout"
        );
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Import services stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
