//! Shared helpers for the integration test suite. Everything runs against
//! the in-memory store backend.

#![allow(dead_code)]

use std::sync::Arc;

use events_backend::models::{CreateEventRequest, CreateUserRequest, EventResponse, User};
use events_backend::store::MemoryStore;
use events_backend::{AppState, Config};

pub fn test_state() -> AppState {
    AppState::with_store(Config::default(), Arc::new(MemoryStore::new()))
}

pub fn user_request(id: &str, name: &str) -> CreateUserRequest {
    CreateUserRequest {
        user_id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn event_request(id: &str, capacity: i32, waitlist_enabled: bool) -> CreateEventRequest {
    CreateEventRequest {
        event_id: Some(id.to_string()),
        title: Some(format!("Event {id}")),
        description: None,
        date: None,
        location: None,
        organizer: None,
        status: None,
        capacity,
        waitlist_enabled: Some(waitlist_enabled),
    }
}

pub async fn seed_user(state: &AppState, id: &str) -> User {
    state
        .create_user(user_request(id, &format!("User {id}")))
        .await
        .expect("seed user")
}

pub async fn seed_event(
    state: &AppState,
    id: &str,
    capacity: i32,
    waitlist_enabled: bool,
) -> EventResponse {
    state
        .create_event(event_request(id, capacity, waitlist_enabled))
        .await
        .expect("seed event")
}
