use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::event::{Event, EventResponse};

/// Registration state for a `(userId, eventId)` pair.
///
/// The absent record is the implicit third state; the only automatic
/// transition is `Waitlist -> Confirmed` via FIFO promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Waitlist,
}

impl RegistrationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Waitlist => "waitlist",
        }
    }

    /// Parse the stored representation.
    ///
    /// # Errors
    /// Returns the raw string when it names no known status.
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "waitlist" => Ok(Self::Waitlist),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's registration on an event, keyed by `(userId, eventId)`.
///
/// `event_title` and `event_date` are snapshots taken at registration time
/// and are deliberately not refreshed when the event is updated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_id: String,
    pub event_id: String,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime<Utc>>,
}

impl Registration {
    /// Build a registration snapshotting the event's opaque fields.
    #[must_use]
    pub fn new(user_id: String, status: RegistrationStatus, event: &Event) -> Self {
        Self {
            user_id,
            event_id: event.event_id.clone(),
            status,
            registered_at: Utc::now(),
            event_title: event.title.clone(),
            event_date: event.date,
        }
    }
}

/// Body of `POST /users/{userId}/registrations`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub event_id: String,
}

/// Body of `POST /events/{eventId}/registrations`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterByEventRequest {
    pub user_id: String,
}

/// Result of a successful register call: the created record plus the
/// post-commit event state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub registration: Registration,
    pub event: EventResponse,
}
