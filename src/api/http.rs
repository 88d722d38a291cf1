// src/api/http.rs
// `POST /messages`, intelligence lookup, and liveness/readiness probes.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::broker::Headers;
use crate::domain::{Channel, ConversationKey, Sender, SupportMessage, MAX_MESSAGE_CHARS};
use crate::error::ValidationError;
use crate::metrics;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub conversation_id: String,
    pub sender: Sender,
    pub message: String,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message_id: String,
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(StatusCode::BAD_REQUEST, e.to_string())
    }
}

fn validate(req: &IngestRequest) -> Result<(), ValidationError> {
    if req.conversation_id.trim().is_empty() {
        return Err(ValidationError::MissingField("conversation_id"));
    }
    if req.message.is_empty() {
        return Err(ValidationError::MissingField("message"));
    }
    if req.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TextTooLong {
            max: MAX_MESSAGE_CHARS,
            actual: req.message.chars().count(),
        });
    }
    Ok(())
}

pub async fn ingest_message(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    validate(&req)?;

    let tenant_id = req.tenant_id.unwrap_or_else(|| "default".to_string());
    let message = SupportMessage {
        message_id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.clone(),
        conversation_id: req.conversation_id.clone(),
        sender: req.sender,
        channel: req.channel.unwrap_or_default(),
        text: req.message,
        timestamp: Utc::now(),
        metadata: req.metadata,
    };

    let headers = Headers::new(tenant_id);
    state
        .broker
        .produce_json(&state.topics.messages_raw, &message.conversation_id, &message, headers)
        .await
        .map_err(|e| {
            warn!(error = %e, "failed to produce ingested message");
            ApiError(StatusCode::SERVICE_UNAVAILABLE, "broker unavailable".into())
        })?;

    Ok(Json(IngestResponse {
        message_id: message.message_id,
        status: "accepted",
        timestamp: message.timestamp,
    }))
}

pub async fn get_intelligence(
    State(state): State<AppState>,
    Path((tenant_id, conversation_id)): Path<(String, String)>,
) -> Response {
    let key = ConversationKey::new(tenant_id, conversation_id);
    match state.aggregator.snapshot(&key) {
        Some(intelligence) => Json(intelligence).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response(),
    }
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "counters": {
            "dlq_records": metrics::dlq_records(),
            "fallback_invocations": metrics::fallback_invocations(),
            "dropped_broadcast_events": state.broadcaster.dropped_total(),
        },
    }))
}
