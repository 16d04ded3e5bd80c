//! Domain records and request/response models.
//!
//! API payloads use camelCase field names on the wire; the structs keep
//! idiomatic snake_case internally.

pub mod event;
pub mod registration;
pub mod user;

pub use event::{CreateEventRequest, Event, EventPatch, EventResponse, EventStatus, UpdateEventRequest};
pub use registration::{
    Registration, RegistrationOutcome, RegistrationStatus, RegisterByEventRequest, RegisterRequest,
};
pub use user::{CreateUserRequest, User};
