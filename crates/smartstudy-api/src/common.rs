// Common DTOs and error mapping for the public API
//
// Every assistant response carries `ok`. Failures are rendered from the
// pipeline's error type so the status mapping lives in one place; the record
// routes add body and lookup failures of their own.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use smartstudy_core::{AssistantError, EntityKind, SchemaViolation, StoreError};
use thiserror::Error;
use utoipa::ToSchema;

/// Failure body: `{ ok: false, error, details?, raw?, repair? }`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub ok: bool,
    /// Only set to `error` when the model picked a bulk delete without a selector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[schema(example = "message required")]
    pub error: String,
    /// Validation issues, or ids created before a bulk plan stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// The model output that could not be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    /// Output of the repair attempt, when it also failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            action: None,
            error: error.into(),
            details: None,
            raw: None,
            repair: None,
        }
    }
}

/// Body of a successful delete: `{ ok: true, id }`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub ok: bool,
    pub id: String,
}

impl DeleteResponse {
    pub fn new(id: impl ToString) -> Self {
        Self {
            ok: true,
            id: id.to_string(),
        }
    }
}

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    /// Request body could not be read
    #[error("{0}")]
    BadRequest(String),

    /// Request body does not match the record schema
    #[error("Invalid request body")]
    InvalidBody(SchemaViolation),

    /// No record with this id for the caller
    #[error("Not found")]
    NotFound,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Assistant(AssistantError::Store(err))
    }
}

/// HTTP status for a pipeline error
pub fn status_for(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::InputMissing
        | AssistantError::ResponseMalformed { .. }
        | AssistantError::SchemaViolation(_)
        | AssistantError::SelectorMissing => StatusCode::BAD_REQUEST,
        AssistantError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
        AssistantError::UpstreamConfigInvalid { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AssistantError::UpstreamUnavailable(_) | AssistantError::Upstream(_) => {
            StatusCode::BAD_GATEWAY
        }
        AssistantError::BulkPlanInterrupted { .. } | AssistantError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<&AssistantError> for ErrorResponse {
    fn from(err: &AssistantError) -> Self {
        match err {
            AssistantError::ResponseMalformed { raw, repair } => ErrorResponse {
                raw: Some(Value::String(raw.clone())),
                repair: Some(repair.clone()),
                ..ErrorResponse::new(err.to_string())
            },
            AssistantError::SchemaViolation(violation) => ErrorResponse {
                details: serde_json::to_value(&violation.issues).ok(),
                raw: Some(violation.raw.clone()),
                ..ErrorResponse::new(err.to_string())
            },
            AssistantError::SelectorMissing => ErrorResponse {
                action: Some("error".to_string()),
                ..ErrorResponse::new(err.to_string())
            },
            AssistantError::EntityNotFound { kind, .. } => match kind {
                EntityKind::Event => ErrorResponse::new("Not found"),
                EntityKind::Task => ErrorResponse::new("Task not found"),
            },
            AssistantError::BulkPlanInterrupted { created_ids, .. } => ErrorResponse {
                details: Some(serde_json::json!({ "createdIds": created_ids })),
                ..ErrorResponse::new(err.to_string())
            },
            other => ErrorResponse::new(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            ApiError::InvalidBody(violation) => {
                tracing::warn!("Request body rejected: {}", violation);
                let body = ErrorResponse {
                    details: serde_json::to_value(&violation.issues).ok(),
                    raw: Some(violation.raw),
                    ..ErrorResponse::new("Invalid request body")
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found"))).into_response()
            }
            ApiError::Assistant(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!(code = err.code(), "Assistant request failed: {}", err);
                } else {
                    tracing::warn!(code = err.code(), "Assistant request rejected: {}", err);
                }
                (status, Json(ErrorResponse::from(&err))).into_response()
            }
        }
    }
}
