// Event CRUD HTTP routes
//
// Direct calendar access for the web client, next to the assistant. Bodies
// are checked against the same schema as `add_event` payloads.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use smartstudy_core::domain::sort_events;
use smartstudy_core::{
    parse_instant, Event, EventFilter, EventPatch, IssueCode, NewEvent, SchemaViolation,
};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::common::{ApiError, DeleteResponse, ErrorResponse};
use crate::state::AppState;

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", get(list_events).post(create_event))
        .route("/v1/events/:id", put(update_event).delete(delete_event))
        .with_state(state)
}

/// Listing window; either bound may be omitted
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventRange {
    /// Events ending at or after this instant
    pub start: Option<String>,
    /// Events starting at or before this instant
    pub end: Option<String>,
}

fn query_instant(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_instant(raw).map(Some).ok_or_else(|| {
            ApiError::InvalidBody(
                SchemaViolation::single(field, IssueCode::InvalidDate, "Invalid ISO-8601 instant")
                    .with_raw(Value::String(raw.to_string())),
            )
        }),
    }
}

pub(crate) fn record_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound)
}

pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// GET /v1/events - List the caller's events, start ascending
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventRange),
    responses(
        (status = 200, description = "Events overlapping the window"),
        (status = 400, description = "Unreadable window bound", body = ErrorResponse),
        (status = 401, description = "Authentication required")
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(range): Query<EventRange>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let start = query_instant("start", range.start.as_deref())?;
    let end = query_instant("end", range.end.as_deref())?;

    let mut events = state
        .events()
        .find_many(&user.owner, &EventFilter::overlapping(start, end))
        .await?;
    sort_events(&mut events);

    Ok(Json(events))
}

/// POST /v1/events - Create an event
#[utoipa::path(
    post,
    path = "/v1/events",
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Body does not match the event schema", body = ErrorResponse),
        (status = 401, description = "Authentication required")
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let body = json_body(payload)?;
    let input = NewEvent::from_value(&body).map_err(ApiError::InvalidBody)?;

    let event = state.events().create(&user.owner, input).await?;
    tracing::info!(owner = %user.owner, event_id = %event.id, "Created event");

    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /v1/events/{id} - Update an event
#[utoipa::path(
    put,
    path = "/v1/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event updated"),
        (status = 400, description = "Body does not match the event schema", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let body = json_body(payload)?;
    let patch = EventPatch::from_value(&body).map_err(ApiError::InvalidBody)?;
    let uuid = record_id(&id)?;

    // a one-sided move must still leave end after start
    if patch.is_one_sided() {
        let stored = state
            .events()
            .find_one(&user.owner, uuid)
            .await?
            .ok_or(ApiError::NotFound)?;
        if let Some(field) = patch.range_conflict(&stored) {
            return Err(ApiError::InvalidBody(
                SchemaViolation::single(field, IssueCode::InvalidRange, "End must be after start")
                    .with_raw(body),
            ));
        }
    }

    let event = state
        .events()
        .update_one(&user.owner, uuid, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(owner = %user.owner, event_id = %event.id, "Updated event");

    Ok(Json(event))
}

/// DELETE /v1/events/{id} - Delete an event
#[utoipa::path(
    delete,
    path = "/v1/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event deleted", body = DeleteResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let uuid = record_id(&id)?;

    let event = state
        .events()
        .delete_one(&user.owner, uuid)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(owner = %user.owner, event_id = %event.id, "Deleted event");

    Ok(Json(DeleteResponse::new(event.id)))
}
