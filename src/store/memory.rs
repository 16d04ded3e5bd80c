//! In-process store backend.
//!
//! Every operation takes the single write lock for its whole critical
//! section, so conditional checks and multi-record mutations are atomic
//! exactly like the durable backend's transactions. Volatile; used by the
//! test suite and for local development without PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::models::event::WAITLIST_CAP;
use crate::models::{Event, EventPatch, Registration, RegistrationStatus, User};

use super::{EventStore, StoreError, StoreResult};

#[derive(Default)]
struct MemoryInner {
    users: HashMap<String, User>,
    events: HashMap<String, Event>,
    /// Keyed by `(userId, eventId)`.
    registrations: HashMap<(String, String), Registration>,
}

/// HashMap-backed [`EventStore`] with the same conditional semantics as
/// the PostgreSQL backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn event_mut<'a>(inner: &'a mut MemoryInner, event_id: &str) -> StoreResult<&'a mut Event> {
    inner
        .events
        .get_mut(event_id)
        .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn put_user_if_absent(&self, user: User) -> StoreResult<User> {
        let mut inner = self.inner.write();
        if inner.users.contains_key(&user.user_id) {
            return Err(StoreError::Duplicate(format!("user {}", user.user_id)));
        }
        inner.users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        self.inner
            .read()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }

    async fn put_event(&self, event: Event) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        inner.events.insert(event.event_id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: &str) -> StoreResult<Event> {
        self.inner
            .read()
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    async fn update_event_opaque(&self, event_id: &str, patch: EventPatch) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let event = event_mut(&mut inner, event_id)?;
        if let Some(title) = patch.title {
            event.title = Some(title);
        }
        if let Some(description) = patch.description {
            event.description = Some(description);
        }
        if let Some(date) = patch.date {
            event.date = Some(date);
        }
        if let Some(location) = patch.location {
            event.location = Some(location);
        }
        if let Some(organizer) = patch.organizer {
            event.organizer = Some(organizer);
        }
        if let Some(status) = patch.status {
            event.status = status;
        }
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, event_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner
            .events
            .remove(event_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.inner.read().events.values().cloned().collect())
    }

    async fn get_registration(&self, user_id: &str, event_id: &str) -> StoreResult<Registration> {
        self.inner
            .read()
            .registrations
            .get(&(user_id.to_string(), event_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("registration {user_id}/{event_id}")))
    }

    async fn query_registrations_by_user(&self, user_id: &str) -> StoreResult<Vec<Registration>> {
        Ok(self
            .inner
            .read()
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_registrations_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>> {
        Ok(self
            .inner
            .read()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn tx_register_confirmed(&self, registration: Registration) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let key = (registration.user_id.clone(), registration.event_id.clone());
        if inner.registrations.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "registration {}/{}",
                key.0, key.1
            )));
        }
        let event = event_mut(&mut inner, &registration.event_id)?;
        if event.registered_count >= event.capacity {
            return Err(StoreError::ConditionFailed(format!(
                "event {} has no free confirmed slot",
                event.event_id
            )));
        }
        event.registered_count += 1;
        event.updated_at = Utc::now();
        let committed = event.clone();
        inner.registrations.insert(key, registration);
        Ok(committed)
    }

    async fn tx_register_waitlist(&self, registration: Registration) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let key = (registration.user_id.clone(), registration.event_id.clone());
        if inner.registrations.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "registration {}/{}",
                key.0, key.1
            )));
        }
        let event = event_mut(&mut inner, &registration.event_id)?;
        if event.registered_count != event.capacity {
            return Err(StoreError::ConditionFailed(format!(
                "event {} is not full, waitlist append refused",
                event.event_id
            )));
        }
        if !event.waitlist_enabled {
            return Err(StoreError::ConditionFailed(format!(
                "event {} has no waitlist",
                event.event_id
            )));
        }
        if event.waitlist.iter().any(|u| u == &registration.user_id) {
            return Err(StoreError::ConditionFailed(format!(
                "user {} already queued on event {}",
                registration.user_id, event.event_id
            )));
        }
        if event.waitlist.len() >= WAITLIST_CAP {
            return Err(StoreError::ConditionFailed(format!(
                "event {} waitlist is at capacity",
                event.event_id
            )));
        }
        event.waitlist.push(registration.user_id.clone());
        event.updated_at = Utc::now();
        let committed = event.clone();
        inner.registrations.insert(key, registration);
        Ok(committed)
    }

    async fn tx_unregister_confirmed(&self, user_id: &str, event_id: &str) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let key = (user_id.to_string(), event_id.to_string());
        match inner.registrations.get(&key) {
            Some(r) if r.status == RegistrationStatus::Confirmed => {}
            Some(_) => {
                return Err(StoreError::ConditionFailed(format!(
                    "registration {user_id}/{event_id} is not confirmed"
                )))
            }
            None => {
                return Err(StoreError::ConditionFailed(format!(
                    "registration {user_id}/{event_id} no longer exists"
                )))
            }
        }
        let event = event_mut(&mut inner, event_id)?;
        if event.registered_count <= 0 {
            return Err(StoreError::ConditionFailed(format!(
                "event {event_id} has no confirmed registrations to release"
            )));
        }
        event.registered_count -= 1;
        event.updated_at = Utc::now();
        let committed = event.clone();
        inner.registrations.remove(&key);
        Ok(committed)
    }

    async fn tx_unregister_waitlist(&self, user_id: &str, event_id: &str) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let key = (user_id.to_string(), event_id.to_string());
        match inner.registrations.get(&key) {
            Some(r) if r.status == RegistrationStatus::Waitlist => {}
            Some(_) => {
                return Err(StoreError::ConditionFailed(format!(
                    "registration {user_id}/{event_id} is not waitlisted"
                )))
            }
            None => {
                return Err(StoreError::ConditionFailed(format!(
                    "registration {user_id}/{event_id} no longer exists"
                )))
            }
        }
        let event = event_mut(&mut inner, event_id)?;
        let Some(position) = event.waitlist.iter().position(|u| u == user_id) else {
            return Err(StoreError::ConditionFailed(format!(
                "user {user_id} is not on the waitlist of event {event_id}"
            )));
        };
        // Order of the remaining entries is preserved.
        event.waitlist.remove(position);
        event.updated_at = Utc::now();
        let committed = event.clone();
        inner.registrations.remove(&key);
        Ok(committed)
    }

    async fn tx_promote_head(&self, event_id: &str, user_id: &str) -> StoreResult<Event> {
        let mut inner = self.inner.write();
        let key = (user_id.to_string(), event_id.to_string());
        match inner.registrations.get(&key) {
            Some(r) if r.status == RegistrationStatus::Waitlist => {}
            _ => {
                return Err(StoreError::ConditionFailed(format!(
                    "registration {user_id}/{event_id} is not awaiting promotion"
                )))
            }
        }
        let event = event_mut(&mut inner, event_id)?;
        if event.waitlist.first().map(String::as_str) != Some(user_id) {
            return Err(StoreError::ConditionFailed(format!(
                "user {user_id} is not at the head of the waitlist of event {event_id}"
            )));
        }
        if event.registered_count >= event.capacity {
            return Err(StoreError::ConditionFailed(format!(
                "event {event_id} has no free slot for promotion"
            )));
        }
        event.waitlist.remove(0);
        event.registered_count += 1;
        event.updated_at = Utc::now();
        let committed = event.clone();
        if let Some(registration) = inner.registrations.get_mut(&key) {
            registration.status = RegistrationStatus::Confirmed;
        }
        Ok(committed)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
