use std::path::Path;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config;
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    build_app_with_static(state, &config::static_dir())
}

/// API routes with the dashboard page served from `static_dir` as the fallback.
pub(crate) fn build_app_with_static(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let api = Router::new()
        .route("/api/view", get(routes::api::get_view))
        .route("/api/regions", get(routes::api::get_regions))
        .route("/api/region", post(routes::api::select_region))
        .route("/api/color-scale", get(routes::api::get_color_scale))
        .route("/api/events", get(routes::sse::view_events))
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics));

    api.layer(CompressionLayer::new())
        .layer(cors)
        .fallback_service(ServeDir::new(static_dir).precompressed_gzip())
        .with_state(state)
}
