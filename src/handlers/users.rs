//! User Handlers
//!
//! Handles user management operations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::models::CreateUserRequest;
use crate::{AppState, Result};

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = crate::models::User),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Duplicate userId")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    let user = state.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get user by id
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    responses(
        (status = 200, description = "User", body = crate::models::User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state.get_user(&user_id).await?;
    Ok(Json(user))
}
