#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use psgc_api::auth::jwt::{generate_access_token, JwtConfig};
use psgc_api::config::{body_limit_for, ServerConfig};
use psgc_api::router::build_app_router;
use psgc_api::state::AppState;
use psgc_core::roles::{ROLE_ADMIN, ROLE_USER};
use psgc_pipeline::{
    ImportConfig, ImportDispatcher, ImportService, JobStore, MemoryReferenceStore, UploadStorage,
};

pub const UPLOAD_PATH: &str = "/api/v1/admin/locations/upload";
pub const SUMMARY_PATH: &str = "/api/v1/admin/locations/summary";

const BOUNDARY: &str = "psgc-test-boundary";

/// Upload limit used by the test app, small enough to exceed in a test.
pub const TEST_MAX_UPLOAD_BYTES: usize = 4 * 1024;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_body_bytes: body_limit_for(TEST_MAX_UPLOAD_BYTES),
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// A running application over the in-memory store.
///
/// The dispatcher runs for as long as this value lives.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryReferenceStore>,
    pub jobs: Arc<JobStore>,
    pub config: ServerConfig,
    cancel: CancellationToken,
    _upload_dir: tempfile::TempDir,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build the full application with the production middleware stack, an
/// in-memory reference store and a running import dispatcher.
pub fn build_test_app() -> TestApp {
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let import_config = Arc::new(ImportConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        batch_size: 2,
        ..ImportConfig::default()
    });
    let config = test_config();

    let store = Arc::new(MemoryReferenceStore::new());
    let jobs = Arc::new(JobStore::new(import_config.max_recorded_errors));
    let cancel = CancellationToken::new();

    let (dispatch, dispatcher) =
        ImportDispatcher::new(store.clone(), Arc::clone(&jobs), Arc::clone(&import_config));
    tokio::spawn(dispatcher.run(cancel.clone()));

    let imports = Arc::new(ImportService::new(
        Arc::clone(&jobs),
        UploadStorage::new(upload_dir.path()),
        dispatch,
        import_config,
    ));

    let state = AppState {
        store: store.clone(),
        imports,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        jobs,
        config,
        cancel,
        _upload_dir: upload_dir,
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn admin_token(app: &TestApp) -> String {
    generate_access_token("admin@test", ROLE_ADMIN, &app.config.jwt).expect("token")
}

pub fn user_token(app: &TestApp) -> String {
    generate_access_token("user@test", ROLE_USER, &app.config.jwt).expect("token")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Encode text fields and an optional `csv_file` part as `multipart/form-data`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"csv_file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

/// POST a multipart body to the upload endpoint.
pub async fn post_multipart(app: &TestApp, token: Option<&str>, body: Vec<u8>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(UPLOAD_PATH)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

/// POST a urlencoded form to the upload endpoint.
pub async fn post_form(app: &TestApp, token: &str, form: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(UPLOAD_PATH)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: &TestApp, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Protocol steps
// ---------------------------------------------------------------------------

/// `start_upload` and return the response JSON.
pub async fn start_upload(app: &TestApp, upload_type: &str, file_name: &str, data: &[u8]) -> serde_json::Value {
    let token = admin_token(app);
    let body = multipart_body(
        &[("action", "start_upload"), ("upload_type", upload_type)],
        Some((file_name, data)),
    );
    body_json(post_multipart(app, Some(&token), body).await).await
}

/// Run an id-only action through a urlencoded form.
pub async fn action(app: &TestApp, action: &str, upload_id: &str) -> serde_json::Value {
    let token = admin_token(app);
    let form = format!("action={action}&upload_id={upload_id}");
    body_json(post_form(app, &token, &form).await).await
}

/// Poll `get_progress` until the job is terminal, checking that progress
/// never moves backwards.
pub async fn poll_until_done(app: &TestApp, upload_id: &str) -> serde_json::Value {
    let mut last_processed = 0;
    let mut last_progress = 0;
    for _ in 0..500 {
        let json = action(app, "get_progress", upload_id).await;
        assert_eq!(json["success"], true, "{json}");

        let processed = json["processed_rows"].as_u64().unwrap();
        let progress = json["progress"].as_u64().unwrap();
        assert!(processed >= last_processed, "processed_rows went backwards: {json}");
        assert!(progress >= last_progress, "progress went backwards: {json}");
        last_processed = processed;
        last_progress = progress;

        if json["status"] == "completed" || json["status"] == "error" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("upload {upload_id} did not finish");
}

/// Upload, process and poll a file to completion.
pub async fn import(app: &TestApp, upload_type: &str, data: &str) -> (String, serde_json::Value) {
    let started = start_upload(app, upload_type, &format!("{upload_type}.csv"), data.as_bytes()).await;
    assert_eq!(started["success"], true, "{started}");
    let upload_id = started["upload_id"].as_str().unwrap().to_string();

    let processed = action(app, "process_upload", &upload_id).await;
    assert_eq!(processed["success"], true, "{processed}");

    let done = poll_until_done(app, &upload_id).await;
    (upload_id, done)
}
