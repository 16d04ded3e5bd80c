//! Validator coverage: identifier charset, bounds on opaque fields, the
//! status enumeration and rejection of engine fields in patches.

mod common;

use events_backend::models::{CreateEventRequest, CreateUserRequest, UpdateEventRequest};
use events_backend::AppError;
use pretty_assertions::assert_eq;
use validator::Validate;

fn detail_fields(err: &AppError) -> Vec<String> {
    // Route through the same conversion the wire envelope uses.
    match err {
        AppError::Validation(ve) => ve
            .field_errors()
            .into_iter()
            .map(|(field, _)| events_backend::utils::validation::camelize(&field))
            .collect(),
        other => panic!("expected a validation error, got {other}"),
    }
}

#[test]
fn user_id_charset_is_enforced() {
    for bad in ["", "  ", "has space", "emoji🦀", &"x".repeat(101)] {
        let request = CreateUserRequest {
            user_id: bad.to_string(),
            name: "valid".to_string(),
        };
        assert!(request.validate().is_err(), "accepted invalid id: {bad:?}");
    }
    for good in ["a", "user-1", "User_2", &"y".repeat(100)] {
        let request = CreateUserRequest {
            user_id: good.to_string(),
            name: "valid".to_string(),
        };
        assert!(request.validate().is_ok(), "rejected valid id: {good:?}");
    }
}

#[test]
fn name_bounds_are_enforced() {
    let too_long = CreateUserRequest {
        user_id: "alice".to_string(),
        name: "n".repeat(201),
    };
    assert!(too_long.validate().is_err());

    let empty = CreateUserRequest {
        user_id: "alice".to_string(),
        name: String::new(),
    };
    assert!(empty.validate().is_err());
}

#[test]
fn capacity_must_be_positive() {
    for capacity in [0, -1, -100] {
        let mut request = common::event_request("e1", 1, false);
        request.capacity = capacity;
        assert!(request.validate().is_err(), "accepted capacity {capacity}");
    }
}

#[test]
fn opaque_field_bounds_are_enforced() {
    let mut request = common::event_request("e1", 5, false);
    request.title = Some("t".repeat(201));
    assert!(request.validate().is_err());

    let mut request = common::event_request("e1", 5, false);
    request.description = Some("d".repeat(1001));
    assert!(request.validate().is_err());

    let mut request = common::event_request("e1", 5, false);
    request.location = Some("l".repeat(201));
    assert!(request.validate().is_err());

    let mut request = common::event_request("e1", 5, false);
    request.organizer = Some("o".repeat(101));
    assert!(request.validate().is_err());
}

#[test]
fn event_status_enumeration_is_closed() {
    for status in ["draft", "published", "cancelled", "completed", "active"] {
        let mut request = common::event_request("e1", 5, false);
        request.status = Some(status.to_string());
        assert!(request.validate().is_ok(), "rejected status {status}");
    }
    let mut request = common::event_request("e1", 5, false);
    request.status = Some("archived".to_string());
    assert!(request.validate().is_err());
}

#[test]
fn blank_event_id_is_rejected() {
    let request = CreateEventRequest {
        event_id: Some("   ".to_string()),
        ..common::event_request("ignored", 5, false)
    };
    assert!(request.validate().is_err());
}

#[tokio::test]
async fn patch_touching_engine_fields_is_a_validation_error() {
    let state = common::test_state();
    common::seed_event(&state, "e1", 5, false).await;

    for (patch, field) in [
        (
            UpdateEventRequest {
                capacity: Some(10),
                ..UpdateEventRequest::default()
            },
            "capacity",
        ),
        (
            UpdateEventRequest {
                registered_count: Some(0),
                ..UpdateEventRequest::default()
            },
            "registeredCount",
        ),
        (
            UpdateEventRequest {
                waitlist_enabled: Some(true),
                ..UpdateEventRequest::default()
            },
            "waitlistEnabled",
        ),
        (
            UpdateEventRequest {
                waitlist: Some(vec!["u1".to_string()]),
                ..UpdateEventRequest::default()
            },
            "waitlist",
        ),
    ] {
        let err = state.update_event("e1", patch).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(
            detail_fields(&err).contains(&field.to_string()),
            "details should reference {field}"
        );
    }
}

#[tokio::test]
async fn whitespace_user_detail_references_user_id() {
    let state = common::test_state();
    let err = state
        .create_user(common::user_request("  ", "x"))
        .await
        .unwrap_err();
    assert!(detail_fields(&err).contains(&"userId".to_string()));
}
