//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use helpdesk_core::{Category, NewTicket, Response, Ticket, WorkflowError};

use super::{api_error, ApiError};
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub subject: String,
    pub body: String,
    pub priority: Option<String>,
    pub language: Option<String>,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A ticket as returned by the API
#[derive(Debug, Serialize)]
pub struct TicketOut {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub category: Option<Category>,
}

impl From<Ticket> for TicketOut {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            subject: ticket.subject,
            body: ticket.body,
            category: ticket.category,
        }
    }
}

/// Acknowledgement for work scheduled in the background
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}

pub(crate) fn workflow_error(err: WorkflowError) -> ApiError {
    match err {
        WorkflowError::TicketNotFound(_) => api_error(StatusCode::NOT_FOUND, "Ticket not found"),
        WorkflowError::SchedulerClosed => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        WorkflowError::Store(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a ticket; it comes back already classified.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<TicketOut>), ApiError> {
    let new_ticket = NewTicket {
        subject: body.subject,
        body: body.body,
        priority: body.priority,
        language: body.language,
    };

    let ticket = state
        .workflow()
        .intake(new_ticket)
        .await
        .map_err(workflow_error)?;

    Ok((StatusCode::CREATED, Json(TicketOut::from(ticket))))
}

/// List tickets, newest first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<Vec<TicketOut>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let tickets = state
        .sessions()
        .open()
        .and_then(|mut session| session.list_tickets(limit, offset))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(tickets.into_iter().map(TicketOut::from).collect()))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TicketOut>, ApiError> {
    match state.sessions().open().and_then(|mut session| session.get_ticket(id)) {
        Ok(Some(ticket)) => Ok(Json(TicketOut::from(ticket))),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "Ticket not found")),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Manually re-trigger drafting. Earlier responses are kept.
pub async fn respond_to_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    tracing::info!(ticket_id = id, "Manual drafting requested");
    state.workflow().request_redraft(id).map_err(workflow_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Response generation has been re-initiated in the background.".to_string(),
        }),
    ))
}

/// Manually re-run classification in the background.
pub async fn classify_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    tracing::info!(ticket_id = id, "Manual re-classification requested");
    state
        .workflow()
        .request_reclassification(id)
        .map_err(workflow_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "Classification has been re-initiated in the background.".to_string(),
        }),
    ))
}

/// All drafting attempts for a ticket, newest first.
///
/// An unknown ticket simply has no responses.
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Response>>, ApiError> {
    let responses = state
        .sessions()
        .open()
        .and_then(|mut session| session.list_responses(id))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(responses))
}
