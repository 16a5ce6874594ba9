use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, inbound, logs, middleware::metrics_middleware, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/health/ml", get(handlers::health_ml))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Tickets
        .route("/tickets", post(tickets::create_ticket).get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/respond", post(tickets::respond_to_ticket))
        .route("/tickets/{id}/classify", post(tickets::classify_ticket))
        .route("/tickets/{id}/responses", get(tickets::list_responses))
        // Inbound email webhook
        .route("/inbound", post(inbound::receive_inbound_email))
        // Persisted log events
        .route("/logs", get(logs::query_logs))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
