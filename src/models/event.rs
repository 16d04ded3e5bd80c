use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::utils::validation::{not_blank, single_field_error, valid_event_status};

/// Hard cap on waitlist length so the event record stays within store
/// record-size limits.
pub const WAITLIST_CAP: usize = 1000;

/// An event with capacity bookkeeping.
///
/// `capacity` and `waitlist_enabled` are immutable after creation.
/// `registered_count` and `waitlist` are owned exclusively by the
/// registration engine; every other component treats them as read-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    pub status: String,
    pub capacity: i32,
    pub registered_count: i32,
    pub waitlist_enabled: bool,
    pub waitlist: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    #[must_use]
    pub fn available_spots(&self) -> i32 {
        self.capacity - self.registered_count
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.registered_count >= self.capacity
    }
}

/// Lifecycle label stored on events. The registration engine treats it as
/// opaque; only membership is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
    Active,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Active => "active",
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Generated (UUID v4) when omitted.
    #[validate(
        length(min = 1, max = 100, message = "eventId must be 1-100 characters"),
        custom(function = not_blank)
    )]
    pub event_id: Option<String>,
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "location must be at most 200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 100, message = "organizer must be at most 100 characters"))]
    pub organizer: Option<String>,
    #[validate(custom(function = valid_event_status))]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: i32,
    pub waitlist_enabled: Option<bool>,
}

impl CreateEventRequest {
    /// Build the stored event with fully initialised bookkeeping fields.
    #[must_use]
    pub fn into_event(self) -> Event {
        let now = Utc::now();
        Event {
            event_id: self
                .event_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: trimmed(self.title),
            description: trimmed(self.description),
            date: self.date,
            location: trimmed(self.location),
            organizer: trimmed(self.organizer),
            status: self
                .status
                .unwrap_or_else(|| EventStatus::default().as_str().to_string()),
            capacity: self.capacity,
            registered_count: 0,
            waitlist_enabled: self.waitlist_enabled.unwrap_or(false),
            waitlist: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Partial update payload. Only opaque fields may be patched; any engine
/// field present in the body is rejected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "location must be at most 200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 100, message = "organizer must be at most 100 characters"))]
    pub organizer: Option<String>,
    #[validate(custom(function = valid_event_status))]
    pub status: Option<String>,

    // Engine-owned fields. Accepted by the deserializer so we can reject
    // them with a proper validation detail instead of a generic 400.
    pub capacity: Option<i32>,
    pub registered_count: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub waitlist: Option<Vec<String>>,
}

impl UpdateEventRequest {
    /// Reject patches that touch capacity bookkeeping.
    ///
    /// # Errors
    /// Returns a single-field validation error naming the offending field.
    pub fn ensure_opaque_only(&self) -> Result<(), ValidationErrors> {
        if self.capacity.is_some() {
            return Err(single_field_error("capacity", "capacity cannot be changed after creation"));
        }
        if self.registered_count.is_some() {
            return Err(single_field_error("registered_count", "registeredCount is managed by the registration engine"));
        }
        if self.waitlist_enabled.is_some() {
            return Err(single_field_error("waitlist_enabled", "waitlistEnabled cannot be changed after creation"));
        }
        if self.waitlist.is_some() {
            return Err(single_field_error("waitlist", "waitlist is managed by the registration engine"));
        }
        Ok(())
    }

    /// Convert the validated request into the store-level patch.
    #[must_use]
    pub fn into_patch(self) -> EventPatch {
        EventPatch {
            title: trimmed(self.title),
            description: trimmed(self.description),
            date: self.date,
            location: trimmed(self.location),
            organizer: trimmed(self.organizer),
            status: self.status,
        }
    }
}

/// Opaque-field patch applied by the store. By construction it cannot name
/// an engine field.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub status: Option<String>,
}

/// Event as returned by the API: the record plus computed occupancy.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub available_spots: i32,
    pub waitlist_count: usize,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        let available_spots = event.available_spots();
        let waitlist_count = event.waitlist.len();
        Self {
            event,
            available_spots,
            waitlist_count,
        }
    }
}
