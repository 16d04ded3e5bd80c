//! Event Handlers
//!
//! CRUD over events. Capacity bookkeeping fields are initialised at
//! creation and untouchable through the update route.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::{CreateEventRequest, UpdateEventRequest};
use crate::{AppState, Result};

/// Event listing filter.
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct EventQuery {
    pub status: Option<String>,
}

/// Create an event
#[utoipa::path(
    post,
    path = "/events",
    tag = "Events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = crate::models::EventResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<impl IntoResponse> {
    let event = state.create_event(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events, optionally filtered by status
#[utoipa::path(
    get,
    path = "/events",
    tag = "Events",
    params(EventQuery),
    responses((status = 200, description = "Events", body = [crate::models::EventResponse]))
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse> {
    let events = state.list_events(query.status).await?;
    Ok(Json(events))
}

/// Get event by id, with computed occupancy
#[utoipa::path(
    get,
    path = "/events/{event_id}",
    tag = "Events",
    responses(
        (status = 200, description = "Event", body = crate::models::EventResponse),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse> {
    let event = state.get_event(&event_id).await?;
    Ok(Json(event))
}

/// Patch opaque event fields
#[utoipa::path(
    put,
    path = "/events/{event_id}",
    tag = "Events",
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = crate::models::EventResponse),
        (status = 400, description = "Validation error or engine field in patch"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse> {
    let event = state.update_event(&event_id, request).await?;
    Ok(Json(event))
}

/// Delete an event
#[utoipa::path(
    delete,
    path = "/events/{event_id}",
    tag = "Events",
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse> {
    state.delete_event(&event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
