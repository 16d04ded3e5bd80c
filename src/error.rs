//! Application-wide error type and mapping to HTTP responses.
//!
//! Keeps the API error shape consistent across handlers. This file intentionally
//! avoids exporting internal store details to clients while preserving them in
//! logs for operators.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};
use validator::ValidationErrors;

use crate::store::StoreError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// The application's unified error type covering the full API taxonomy.
#[derive(Debug)]
pub enum AppError {
    /// Validator rejection; carries per-field details.
    Validation(ValidationErrors),
    UserNotFound(String),
    EventNotFound(String),
    RegistrationNotFound {
        user_id: String,
        event_id: String,
    },
    DuplicateUser(String),
    AlreadyRegistered {
        user_id: String,
        event_id: String,
    },
    AlreadyOnWaitlist {
        user_id: String,
        event_id: String,
    },
    /// Capacity reached and the event has no waitlist.
    EventFull(String),
    /// Optimistic retry budget exhausted.
    Contention(String),
    /// Transient store failures exceeding the retry budget.
    ServiceUnavailable(String),
    BadRequest(String),
    Internal(String),
    ConfigLoad(config::ConfigError),
    ConfigValidation(String),
    IO(std::io::Error),
    Serde(serde_json::Error),
}

/// One entry of the `details[]` array on validation failures.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

/// Error payload carried from `IntoResponse` to the envelope middleware,
/// which fills in `path` and `requestId` before the response leaves the
/// router.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Vec<ValidationDetail>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: WireError<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireError<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [ValidationDetail]>,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

impl ErrorBody {
    /// Render the wire envelope. `path` and `request_id` are known only to
    /// the middleware, hence the late binding.
    #[must_use]
    pub fn to_response(&self, path: Option<&str>, request_id: Option<&str>) -> Response {
        let envelope = ErrorEnvelope {
            error: WireError {
                code: self.code,
                message: &self.message,
                details: self.details.as_deref(),
                timestamp: self.timestamp,
                path,
                request_id,
            },
        };
        (self.status, Json(envelope)).into_response()
    }
}

//--- Trait Implementations ---//

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log_message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ConfigLoad(err) => Some(err),
            Self::IO(err) => Some(err),
            Self::Serde(err) => Some(err),
            // Errors wrapping only a String don't have a source
            _ => None,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigLoad(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err)
    }
}

/// Fallback mapping for store failures that reach a caller without a more
/// specific translation. The engine and services normally map `NotFound`
/// and `Duplicate` to the entity-specific variants themselves.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(msg) => Self::ServiceUnavailable(msg),
            StoreError::ConditionFailed(msg) => Self::Contention(msg),
            StoreError::NotFound(what) => {
                Self::Internal(format!("unexpected missing record: {what}"))
            }
            StoreError::Duplicate(what) => {
                Self::Internal(format!("unexpected duplicate record: {what}"))
            }
        }
    }
}

impl AppError {
    /// Message used for operator logs; may contain internal context.
    fn log_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Validation error: {err}"),
            Self::UserNotFound(id) => format!("User not found: {id}"),
            Self::EventNotFound(id) => format!("Event not found: {id}"),
            Self::RegistrationNotFound { user_id, event_id } => {
                format!("Registration not found: user={user_id} event={event_id}")
            }
            Self::DuplicateUser(id) => format!("Duplicate user: {id}"),
            Self::AlreadyRegistered { user_id, event_id } => {
                format!("Already registered: user={user_id} event={event_id}")
            }
            Self::AlreadyOnWaitlist { user_id, event_id } => {
                format!("Already on waitlist: user={user_id} event={event_id}")
            }
            Self::EventFull(id) => format!("Event full: {id}"),
            Self::Contention(msg) => format!("Contention: {msg}"),
            Self::ServiceUnavailable(msg) => format!("Service unavailable: {msg}"),
            Self::BadRequest(msg) => format!("Bad request: {msg}"),
            Self::Internal(msg) => format!("Internal error: {msg}"),
            Self::ConfigLoad(err) => format!("Configuration loading error: {err}"),
            Self::ConfigValidation(msg) => format!("Configuration validation error: {msg}"),
            Self::IO(err) => format!("IO error: {err}"),
            Self::Serde(err) => format!("Serialization error: {err}"),
        }
    }

    /// Stable machine-readable code carried in the wire envelope.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => "VALIDATION_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::RegistrationNotFound { .. } => "REGISTRATION_NOT_FOUND",
            Self::DuplicateUser(_) => "DUPLICATE_USER",
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::AlreadyOnWaitlist { .. } => "ALREADY_ON_WAITLIST",
            Self::EventFull(_) => "EVENT_FULL",
            Self::Contention(_) => "CONTENTION",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_)
            | Self::ConfigLoad(_)
            | Self::ConfigValidation(_)
            | Self::IO(_)
            | Self::Serde(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status per the error taxonomy.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::EventNotFound(_) | Self::RegistrationNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::DuplicateUser(_)
            | Self::AlreadyRegistered { .. }
            | Self::AlreadyOnWaitlist { .. }
            | Self::EventFull(_) => StatusCode::CONFLICT,
            Self::Contention(_) | Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_)
            | Self::ConfigLoad(_)
            | Self::ConfigValidation(_)
            | Self::IO(_)
            | Self::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal errors get a generic message so the
    /// store's raw error never surfaces.
    fn client_message(&self) -> String {
        match self {
            Self::Validation(_) => "Invalid input".to_string(),
            Self::UserNotFound(id) => format!("User '{id}' not found"),
            Self::EventNotFound(id) => format!("Event '{id}' not found"),
            Self::RegistrationNotFound { user_id, event_id } => {
                format!("No registration for user '{user_id}' on event '{event_id}'")
            }
            Self::DuplicateUser(id) => format!("User '{id}' already exists"),
            Self::AlreadyRegistered { user_id, event_id } => {
                format!("User '{user_id}' is already registered for event '{event_id}'")
            }
            Self::AlreadyOnWaitlist { user_id, event_id } => {
                format!("User '{user_id}' is already on the waitlist for event '{event_id}'")
            }
            Self::EventFull(id) => format!("Event '{id}' is full and has no waitlist"),
            Self::Contention(_) => {
                "The operation could not complete due to concurrent updates; please retry"
                    .to_string()
            }
            Self::ServiceUnavailable(_) => {
                "The service is temporarily unavailable; please retry".to_string()
            }
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_)
            | Self::ConfigLoad(_)
            | Self::ConfigValidation(_)
            | Self::IO(_)
            | Self::Serde(_) => "An internal server error occurred".to_string(),
        }
    }

    /// Extract per-field details from a validator rejection.
    fn validation_details(&self) -> Option<Vec<ValidationDetail>> {
        let Self::Validation(ve) = self else {
            return None;
        };
        let details: Vec<ValidationDetail> = ve
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                // Report the field under its wire (camelCase) name.
                let wire_field = crate::utils::validation::camelize(&field);
                errors.iter().map(move |e| ValidationDetail {
                    field: wire_field.clone(),
                    message: e.message.as_ref().map_or_else(
                        || format!("Invalid value for field '{field}'"),
                        ToString::to_string,
                    ),
                })
            })
            .collect();
        Some(details)
    }

    /// Build the payload the envelope middleware completes with request
    /// context.
    #[must_use]
    pub fn into_body(self) -> ErrorBody {
        ErrorBody {
            status: self.status_code(),
            code: self.error_code(),
            message: self.client_message(),
            details: self.validation_details(),
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            error!(code = self.error_code(), "Converting error into HTTP response: {}", self);
        } else {
            debug!(code = self.error_code(), "Converting error into HTTP response: {}", self);
        }

        let body = self.into_body();
        let mut response = body.to_response(None, None);
        // The envelope middleware re-renders the body with path/requestId.
        response.extensions_mut().insert(body);
        response
    }
}
