//! Admin API.
//!
//! All routes require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use self::auth::require_admin_key;
use self::handlers::*;
use crate::gateway::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/cache", get(get_cache).delete(clear_cache))
        .route("/admin/prefetch", post(prefetch))
        .route_layer(middleware::from_fn_with_state(state, require_admin_key))
}
