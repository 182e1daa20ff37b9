// Assistant HTTP route

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use smartstudy_core::AssistantReply;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::common::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Chat message sent to the assistant
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssistantRequest {
    #[schema(example = "Add Algorithms lecture tomorrow 10-12 in B201")]
    pub message: Option<String>,
}

/// Success body: `{ ok: true, action, ... }` or `{ ok: true, help, suggestions? }`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssistantResponse {
    /// Always `true`
    pub ok: bool,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub reply: AssistantReply,
}

impl From<AssistantReply> for AssistantResponse {
    fn from(reply: AssistantReply) -> Self {
        Self { ok: true, reply }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/assistant", post(assist))
        .with_state(state)
}

/// POST /v1/assistant - Turn a chat message into one calendar or task operation
#[utoipa::path(
    post,
    path = "/v1/assistant",
    request_body = AssistantRequest,
    responses(
        (status = 200, description = "Intent executed", body = AssistantResponse),
        (status = 400, description = "Missing message or unusable model output", body = ErrorResponse),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Referenced event or task not found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
        (status = 502, description = "Language model unavailable", body = ErrorResponse),
        (status = 503, description = "Configured model rejected", body = ErrorResponse)
    ),
    tag = "assistant"
)]
pub async fn assist(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<AssistantRequest>, JsonRejection>,
) -> Result<Json<AssistantResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let message = req.message.unwrap_or_default();

    tracing::debug!(owner = %user.owner, chars = message.len(), "Assistant request");

    let reply = state.assistant.handle(&user.owner, &message).await?;

    tracing::info!(owner = %user.owner, action = reply.label(), "Assistant request handled");
    Ok(Json(reply.into()))
}
