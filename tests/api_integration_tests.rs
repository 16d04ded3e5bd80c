//! End-to-end HTTP tests against the real router with the in-memory
//! store: status codes, the success payloads and the error envelope.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt; // provides collect
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use events_backend::routes::create_router;

fn app() -> Router {
    create_router(common::test_state())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn user_creation_round_trips_over_http() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"userId": "alice", "name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], "alice");
    assert_eq!(body["name"], "Alice");

    let (status, body) = send(&app, "GET", "/users/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "alice");
}

#[tokio::test]
async fn whitespace_user_id_returns_validation_envelope() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"userId": "  ", "name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = &body["error"];
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["path"], "/users");
    assert!(error["requestId"].is_string());
    assert!(error["timestamp"].is_string());
    let details = error["details"].as_array().expect("details array");
    assert!(
        details.iter().any(|d| d["field"] == "userId"),
        "details must reference userId: {details:?}"
    );
}

#[tokio::test]
async fn duplicate_user_maps_to_409() {
    let app = app();
    let payload = json!({"userId": "alice", "name": "Alice"});
    send(&app, "POST", "/users", Some(payload.clone())).await;

    let (status, body) = send(&app, "POST", "/users", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_USER");
}

#[tokio::test]
async fn unknown_user_returns_envelope_with_context() {
    let app = app();
    let (status, body) = send(&app, "GET", "/users/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
    assert_eq!(body["error"]["path"], "/users/ghost");
}

#[tokio::test]
async fn event_lifecycle_over_http() {
    let app = app();

    let (status, created) = send(
        &app,
        "POST",
        "/events",
        Some(json!({
            "title": "Rust Meetup",
            "capacity": 2,
            "waitlistEnabled": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["registeredCount"], 0);
    assert_eq!(created["availableSpots"], 2);
    assert_eq!(created["waitlistCount"], 0);
    let event_id = created["eventId"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, "GET", &format!("/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Rust Meetup");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/events/{event_id}"),
        Some(json!({"title": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/events/{event_id}"),
        Some(json!({"capacity": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, "DELETE", &format!("/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_flow_over_http() {
    let app = app();
    for user in ["u1", "u2", "u3"] {
        send(
            &app,
            "POST",
            "/users",
            Some(json!({"userId": user, "name": user})),
        )
        .await;
    }
    send(
        &app,
        "POST",
        "/events",
        Some(json!({"eventId": "e", "title": "E", "capacity": 1, "waitlistEnabled": true})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/users/u1/registrations",
        Some(json!({"eventId": "e"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registration"]["status"], "confirmed");
    assert_eq!(body["event"]["registeredCount"], 1);

    // Event-centric alias hits the same records.
    let (status, body) = send(
        &app,
        "POST",
        "/events/e/registrations",
        Some(json!({"userId": "u2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registration"]["status"], "waitlist");
    assert_eq!(body["event"]["waitlistCount"], 1);

    let (status, body) = send(
        &app,
        "POST",
        "/users/u1/registrations",
        Some(json!({"eventId": "e"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_REGISTERED");

    let (status, body) = send(&app, "GET", "/events/e/registrations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Departure promotes the waitlist head.
    let (status, _) = send(&app, "DELETE", "/users/u1/registrations/e", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/users/u2/registrations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "confirmed");

    let (status, body) = send(&app, "DELETE", "/events/e/registrations/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "REGISTRATION_NOT_FOUND");
}

#[tokio::test]
async fn full_event_without_waitlist_maps_to_409() {
    let app = app();
    for user in ["u1", "u2"] {
        send(
            &app,
            "POST",
            "/users",
            Some(json!({"userId": user, "name": user})),
        )
        .await;
    }
    send(
        &app,
        "POST",
        "/events",
        Some(json!({"eventId": "solo", "capacity": 1})),
    )
    .await;

    send(
        &app,
        "POST",
        "/users/u1/registrations",
        Some(json!({"eventId": "solo"})),
    )
    .await;
    let (status, body) = send(
        &app,
        "POST",
        "/users/u2/registrations",
        Some(json!({"eventId": "solo"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EVENT_FULL");
}

#[tokio::test]
async fn unknown_route_gets_enveloped_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["path"], "/nope");
}

#[tokio::test]
async fn health_reports_store_and_counters() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "up");
    assert!(body["metrics"]["registrations_confirmed"].is_u64());
}
