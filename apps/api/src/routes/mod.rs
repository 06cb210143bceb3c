//! Route modules, one per aggregate.
//!
//! Each module exports `router()` returning a `Router<Arc<AppState>>`;
//! [`build`] nests them under their path prefixes and attaches tracing.
//!
//! Every handler follows the same shape:
//! 1. authenticate (`CurrentUser` extractor → 401)
//! 2. authorize (`user.require(Action::…)` → 403, policy table in core)
//! 3. validate input
//! 4. delegate to a repository
//! 5. shape the response

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod analytics;
pub mod bulk;
pub mod customers;
pub mod cylinders;
pub mod maintenance;
pub mod movements;
pub mod users;

/// `skip`/`limit` query parameters shared by every collection endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Builds the full application router.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/customers", customers::router())
        .nest("/cylinders", cylinders::router())
        .nest("/movements", movements::router())
        .nest("/maintenance", maintenance::router())
        .nest("/analytics", analytics::router())
        .nest("/bulk", bulk::router())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unauthenticated liveness probe.
async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(serde_json::json!({
            "status": "up",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
