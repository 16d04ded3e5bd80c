//! Registration Handlers
//!
//! User-centric routes plus the event-centric aliases. Both operate on the
//! same underlying records through the registration engine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::models::{RegisterByEventRequest, RegisterRequest};
use crate::{AppState, Result};

/// Register a user for an event
#[utoipa::path(
    post,
    path = "/users/{user_id}/registrations",
    tag = "Registrations",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration created (confirmed or waitlisted)", body = crate::models::RegistrationOutcome),
        (status = 404, description = "User or event not found"),
        (status = 409, description = "Already registered / already on waitlist / event full")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state.register(&user_id, &request.event_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Remove a user's registration (promotes the waitlist head when a
/// confirmed spot frees up)
#[utoipa::path(
    delete,
    path = "/users/{user_id}/registrations/{event_id}",
    tag = "Registrations",
    responses(
        (status = 204, description = "Registration removed"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn unregister_user(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state.unregister(&user_id, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a user's registrations
#[utoipa::path(
    get,
    path = "/users/{user_id}/registrations",
    tag = "Registrations",
    responses(
        (status = 200, description = "Registrations", body = [crate::models::Registration]),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_registrations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let registrations = state.user_registrations(&user_id).await?;
    Ok(Json(registrations))
}

/// Register a user for an event (event-centric alias)
#[utoipa::path(
    post,
    path = "/events/{event_id}/registrations",
    tag = "Registrations",
    request_body = RegisterByEventRequest,
    responses(
        (status = 201, description = "Registration created (confirmed or waitlisted)", body = crate::models::RegistrationOutcome),
        (status = 404, description = "User or event not found"),
        (status = 409, description = "Already registered / already on waitlist / event full")
    )
)]
pub async fn register_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<RegisterByEventRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state.register(&request.user_id, &event_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Remove a registration (event-centric alias)
#[utoipa::path(
    delete,
    path = "/events/{event_id}/registrations/{user_id}",
    tag = "Registrations",
    responses(
        (status = 204, description = "Registration removed"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn unregister_from_event(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state.unregister(&user_id, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List an event's registrations
#[utoipa::path(
    get,
    path = "/events/{event_id}/registrations",
    tag = "Registrations",
    responses(
        (status = 200, description = "Registrations", body = [crate::models::Registration]),
        (status = 404, description = "Event not found")
    )
)]
pub async fn list_event_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse> {
    let registrations = state.event_registrations(&event_id).await?;
    Ok(Json(registrations))
}
