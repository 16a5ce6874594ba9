use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use helpdesk_core::SanitizedConfig;

use super::api_error;
use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
}

/// Liveness plus a storage round trip. Always 200; `db` says whether storage answered.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db = match state.sessions().open().and_then(|mut session| session.ping()) {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach storage");
            "down"
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        db: db.to_string(),
    })
}

#[derive(Serialize)]
pub struct MlHealthResponse {
    pub backend: String,
    pub model: String,
    pub device: String,
    pub gpu_available: bool,
    pub gpu_count: u32,
}

/// Which classifier backend is serving requests.
pub async fn health_ml(State(state): State<Arc<AppState>>) -> Json<MlHealthResponse> {
    let info = state.workflow().classifier_info();
    Json(MlHealthResponse {
        backend: info.backend.clone(),
        model: info.model.clone(),
        device: info.device.clone(),
        gpu_available: false,
        gpu_count: 0,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => Ok((
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
