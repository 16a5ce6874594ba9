//! Query the persisted log events.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use helpdesk_core::{LogFilter, LogLevel, LogRecord};

use super::{api_error, ApiError};
use crate::state::AppState;

const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    pub ticket_id: Option<i64>,
    pub event_type: Option<String>,
    pub level: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LogQueryResponse {
    pub events: Vec<LogRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// List log events, newest first
pub async fn query_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<LogQueryResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = LogFilter::new().with_limit(limit).with_offset(offset);
    if let Some(ticket_id) = params.ticket_id {
        filter = filter.with_ticket_id(ticket_id);
    }
    if let Some(event_type) = params.event_type {
        filter = filter.with_event_type(event_type);
    }
    if let Some(level) = params.level {
        let level: LogLevel = level
            .parse()
            .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_level(level);
    }

    let mut session = state
        .sessions()
        .open()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let events = session
        .list_logs(&filter)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total = session
        .count_logs(&filter)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(LogQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
