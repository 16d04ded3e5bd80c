//! HTTP handlers: thin translation between the HTTP surface and the
//! services. All business decisions live below this layer.

pub mod events;
pub mod health;
pub mod registrations;
pub mod users;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;

use crate::error::ErrorBody;

/// Fallback for unknown routes, rendered in the standard error envelope.
pub async fn not_found() -> Response {
    let body = ErrorBody {
        status: StatusCode::NOT_FOUND,
        code: "NOT_FOUND",
        message: "Resource not found".to_string(),
        details: None,
        timestamp: Utc::now(),
    };
    let mut response = body.to_response(None, None);
    response.extensions_mut().insert(body);
    response
}
