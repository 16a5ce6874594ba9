//! Inbound email webhook.
//!
//! An upstream mail worker POSTs each received message as JSON and signs the
//! raw body with HMAC-SHA256 over the shared secret. Verified messages go
//! through the same intake path as `POST /tickets`.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use helpdesk_core::NewTicket;

use super::tickets::{workflow_error, TicketOut};
use super::{api_error, ApiError};
use crate::metrics::INBOUND_REJECTED_TOTAL;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Deserialize)]
pub struct Attachment {
    pub filename: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub data: Option<String>,
}

/// Email as delivered by the mail worker
#[derive(Debug, Deserialize)]
pub struct EmailPayload {
    pub to: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    pub date: String,
    pub text: String,
    pub html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Constant-time check of a hex signature against the body.
fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn reject(reason: &'static str, status: StatusCode, message: &str) -> ApiError {
    INBOUND_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    tracing::warn!(reason, event_type = "inbound_rejected", "{}", message);
    api_error(status, message)
}

pub async fn receive_inbound_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<TicketOut>), ApiError> {
    let Some(secret) = state.inbound_secret() else {
        return Err(reject(
            "not_configured",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Inbound shared secret is not set",
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(secret, &body, signature) {
        return Err(reject(
            "bad_signature",
            StatusCode::UNAUTHORIZED,
            "Invalid signature",
        ));
    }

    let payload: EmailPayload = serde_json::from_slice(&body).map_err(|e| {
        reject(
            "bad_payload",
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Invalid email payload: {}", e),
        )
    })?;

    tracing::info!(
        from = %payload.sender,
        to = %payload.to,
        attachments = payload.attachments.len(),
        "Inbound email received"
    );

    let ticket = state
        .workflow()
        .intake(NewTicket::new(payload.subject, payload.text))
        .await
        .map_err(workflow_error)?;

    Ok((StatusCode::CREATED, Json(TicketOut::from(ticket))))
}
