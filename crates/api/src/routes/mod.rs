pub mod health;
pub mod locations;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /admin/locations/upload                 multiplexed import actions (admin only)
/// /admin/locations/summary                reference table counts (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/admin/locations", locations::router())
}
