//! Builds the axum `Router` for the admin HTTP API (spec.md §6), grounded
//! on `knhk-workflow-engine::api::rest::RestApiServer`'s
//! `with_state`-over-`Arc<T>` shape.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use orchestry_control::Runtime;

use crate::handlers;

pub fn build_router(runtime: Arc<Runtime>) -> Router {
    Router::new()
        .route("/apps/register", post(handlers::register_app))
        .route("/apps/:name/up", post(handlers::up_app))
        .route("/apps/:name/down", post(handlers::down_app))
        .route("/apps/:name/status", get(handlers::app_status))
        .route("/apps/:name/scale", post(handlers::scale_app))
        .route("/apps/:name/policy", post(handlers::set_policy))
        .route("/apps/:name/raw", get(handlers::raw_spec))
        .route("/apps/:name/metrics", get(handlers::app_metrics))
        .route("/apps/:name/simulateMetrics", post(handlers::simulate_metrics))
        .route("/apps", get(handlers::list_apps))
        .route("/metrics", get(handlers::global_metrics))
        .route("/internal/metrics", get(handlers::prometheus_metrics))
        .route("/events", get(handlers::list_events))
        .route("/cluster/status", get(handlers::cluster_status))
        .route("/cluster/leader", get(handlers::cluster_leader))
        .route("/cluster/health", get(handlers::cluster_health))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}
