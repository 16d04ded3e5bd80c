//! HTTP middleware.
//!
//! The request-context middleware assigns a request id (honouring a
//! caller-supplied `X-Request-ID`) and completes error envelopes with the
//! request path and id, which are unknown to `AppError::into_response`.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ErrorBody;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID propagation + error envelope completion.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let path = request.uri().path().to_string();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let mut response = next.run(request).await;

    // Error responses park their payload in the extensions; re-render them
    // with full request context.
    if let Some(body) = response.extensions().get::<ErrorBody>().cloned() {
        response = body.to_response(Some(&path), Some(&request_id));
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
