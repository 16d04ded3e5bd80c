//! Error taxonomy mapping: HTTP statuses, stable codes and the wire
//! envelope payload.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use events_backend::error::AppError;
use pretty_assertions::assert_eq;

#[test]
fn not_found_variants_map_to_404() {
    for err in [
        AppError::UserNotFound("u".into()),
        AppError::EventNotFound("e".into()),
        AppError::RegistrationNotFound {
            user_id: "u".into(),
            event_id: "e".into(),
        },
    ] {
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}

#[test]
fn conflict_variants_map_to_409() {
    for err in [
        AppError::DuplicateUser("u".into()),
        AppError::AlreadyRegistered {
            user_id: "u".into(),
            event_id: "e".into(),
        },
        AppError::AlreadyOnWaitlist {
            user_id: "u".into(),
            event_id: "e".into(),
        },
        AppError::EventFull("e".into()),
    ] {
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}

#[test]
fn transient_variants_map_to_503() {
    assert_eq!(
        AppError::Contention("retries exhausted".into()).status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        AppError::ServiceUnavailable("store down".into()).status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[test]
fn internal_maps_to_500_and_generic_message() {
    let err = AppError::Internal("secret stacktrace".into());
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn internal_details_never_reach_the_body() {
    let body = AppError::Internal("connection to 10.0.0.5 refused".into()).into_body();
    assert_eq!(body.code, "INTERNAL_ERROR");
    assert!(!body.message.contains("10.0.0.5"));
}

#[test]
fn codes_are_stable() {
    assert_eq!(
        AppError::DuplicateUser("u".into()).error_code(),
        "DUPLICATE_USER"
    );
    assert_eq!(
        AppError::EventFull("e".into()).error_code(),
        "EVENT_FULL"
    );
    assert_eq!(
        AppError::Contention("x".into()).error_code(),
        "CONTENTION"
    );
    assert_eq!(
        AppError::ServiceUnavailable("x".into()).error_code(),
        "SERVICE_UNAVAILABLE"
    );
}

#[test]
fn body_carries_code_message_and_timestamp() {
    let body = AppError::EventFull("e9".into()).into_body();
    assert_eq!(body.status, StatusCode::CONFLICT);
    assert_eq!(body.code, "EVENT_FULL");
    assert!(body.message.contains("e9"));
    assert!(body.details.is_none());
}
