//! Route definitions for the location reference-data importer.
//!
//! Mounted at `/admin/locations`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locations;
use crate::state::AppState;

/// Routes mounted at `/admin/locations`.
///
/// ```text
/// POST   /upload       -> upload    (multipart or urlencoded, by action)
/// GET    /summary      -> summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(locations::upload))
        .route("/summary", get(locations::summary))
}
