//! The registration engine.
//!
//! Owns every mutation of `registered_count`, the waitlist and the
//! Registration records. Control flow is a decision on a freshly read
//! snapshot plus a conditional commit; a failed condition means another
//! writer got there first, so the engine re-reads and re-decides under a
//! bounded retry budget. There are no in-process locks: correctness comes
//! from the store's conditional transactions, which also makes the engine
//! safe to run across many instances.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::event::WAITLIST_CAP;
use crate::models::{Event, Registration, RegistrationOutcome, RegistrationStatus};
use crate::store::{SharedStore, StoreError};

/// Retry budget and deadline for one engine operation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Optimistic retry attempts per operation before giving up with a
    /// contention error.
    pub max_attempts: u32,
    /// End-to-end deadline per operation, spanning all retries.
    pub op_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            op_deadline: Duration::from_secs(5),
        }
    }
}

/// Per-pair logical state derived from the Registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairState {
    Absent,
    Confirmed,
    Waitlisted,
}

/// Commit plan decided from an event snapshot.
#[derive(Debug, Clone, Copy)]
enum Plan {
    Confirmed,
    Waitlist,
}

#[derive(Clone)]
pub struct RegistrationEngine {
    store: SharedStore,
    config: EngineConfig,
}

impl RegistrationEngine {
    #[must_use]
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Register a user for an event, either confirmed or waitlisted.
    ///
    /// # Errors
    /// `UserNotFound` / `EventNotFound` for unknown references,
    /// `AlreadyRegistered` / `AlreadyOnWaitlist` for an existing record,
    /// `EventFull` when capacity is reached without a waitlist, and
    /// `Contention` when the retry budget is spent against concurrent
    /// writers.
    pub async fn register(&self, user_id: &str, event_id: &str) -> Result<RegistrationOutcome> {
        let deadline = Instant::now() + self.config.op_deadline;

        self.store.get_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::UserNotFound(user_id.to_string()),
            other => other.into(),
        })?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let event = self.store.get_event(event_id).await.map_err(|e| match e {
                StoreError::NotFound(_) => AppError::EventNotFound(event_id.to_string()),
                other => other.into(),
            })?;

            match self.pair_state(user_id, event_id).await? {
                PairState::Confirmed => {
                    return Err(AppError::AlreadyRegistered {
                        user_id: user_id.to_string(),
                        event_id: event_id.to_string(),
                    })
                }
                PairState::Waitlisted => {
                    return Err(AppError::AlreadyOnWaitlist {
                        user_id: user_id.to_string(),
                        event_id: event_id.to_string(),
                    })
                }
                PairState::Absent => {}
            }

            let plan = Self::decide(&event).ok_or_else(|| {
                debug!(user_id, event_id, "event full without usable waitlist");
                AppError::EventFull(event_id.to_string())
            })?;

            let status = match plan {
                Plan::Confirmed => RegistrationStatus::Confirmed,
                Plan::Waitlist => RegistrationStatus::Waitlist,
            };
            // Snapshot of the event's opaque fields at decision time.
            let registration = Registration::new(user_id.to_string(), status, &event);

            let committed = match plan {
                Plan::Confirmed => self.store.tx_register_confirmed(registration.clone()).await,
                Plan::Waitlist => self.store.tx_register_waitlist(registration.clone()).await,
            };

            match committed {
                Ok(event) => {
                    info!(
                        user_id,
                        event_id,
                        status = %registration.status,
                        registered_count = event.registered_count,
                        waitlist_len = event.waitlist.len(),
                        "registration committed"
                    );
                    return Ok(RegistrationOutcome {
                        registration,
                        event: event.into(),
                    });
                }
                // Another writer raced us: the slot filled, the waitlist
                // shifted, or the same pair registered concurrently.
                // Re-read and re-decide.
                Err(StoreError::ConditionFailed(reason)) | Err(StoreError::Duplicate(reason)) => {
                    if attempt >= self.config.max_attempts || Instant::now() >= deadline {
                        warn!(user_id, event_id, attempt, "register retry budget exhausted");
                        return Err(AppError::Contention(format!(
                            "register {user_id}/{event_id}: {reason}"
                        )));
                    }
                    debug!(user_id, event_id, attempt, %reason, "register raced, retrying");
                }
                Err(StoreError::NotFound(_)) => {
                    // Event deleted between snapshot and commit.
                    return Err(AppError::EventNotFound(event_id.to_string()));
                }
                Err(e @ StoreError::Transient(_)) => return Err(e.into()),
            }
        }
    }

    /// Remove a user's registration; a confirmed departure triggers FIFO
    /// promotion of the waitlist head.
    ///
    /// # Errors
    /// `RegistrationNotFound` when no record exists, `Contention` when the
    /// retry budget is spent.
    pub async fn unregister(&self, user_id: &str, event_id: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.op_deadline;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let registration = self
                .store
                .get_registration(user_id, event_id)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(_) => AppError::RegistrationNotFound {
                        user_id: user_id.to_string(),
                        event_id: event_id.to_string(),
                    },
                    other => other.into(),
                })?;

            let result = match registration.status {
                RegistrationStatus::Confirmed => {
                    self.store.tx_unregister_confirmed(user_id, event_id).await
                }
                RegistrationStatus::Waitlist => {
                    self.store.tx_unregister_waitlist(user_id, event_id).await
                }
            };

            match result {
                Ok(event) => {
                    info!(
                        user_id,
                        event_id,
                        status = %registration.status,
                        registered_count = event.registered_count,
                        "registration removed"
                    );
                    if registration.status == RegistrationStatus::Confirmed {
                        self.promote_head(event).await;
                    }
                    return Ok(());
                }
                // Status flipped or the record vanished between read and
                // commit; re-read for a fresh decision (or a proper 404).
                Err(StoreError::ConditionFailed(reason)) => {
                    if attempt >= self.config.max_attempts || Instant::now() >= deadline {
                        warn!(user_id, event_id, attempt, "unregister retry budget exhausted");
                        return Err(AppError::Contention(format!(
                            "unregister {user_id}/{event_id}: {reason}"
                        )));
                    }
                    debug!(user_id, event_id, attempt, %reason, "unregister raced, retrying");
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(AppError::EventNotFound(event_id.to_string()))
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// List all registrations of an existing user. `[]` when none.
    ///
    /// # Errors
    /// `UserNotFound` for an unknown user.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Registration>> {
        self.store.get_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::UserNotFound(user_id.to_string()),
            other => other.into(),
        })?;
        Ok(self.store.query_registrations_by_user(user_id).await?)
    }

    /// List all registrations of an existing event. `[]` when none.
    ///
    /// # Errors
    /// `EventNotFound` for an unknown event.
    pub async fn list_for_event(&self, event_id: &str) -> Result<Vec<Registration>> {
        self.store.get_event(event_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::EventNotFound(event_id.to_string()),
            other => other.into(),
        })?;
        Ok(self.store.query_registrations_by_event(event_id).await?)
    }

    /// Choose the commit path from an event snapshot. `None` means the
    /// request cannot be satisfied (full, and the waitlist is disabled or
    /// at its cap).
    fn decide(event: &Event) -> Option<Plan> {
        if event.registered_count < event.capacity {
            return Some(Plan::Confirmed);
        }
        if event.waitlist_enabled && event.waitlist.len() < WAITLIST_CAP {
            return Some(Plan::Waitlist);
        }
        None
    }

    async fn pair_state(&self, user_id: &str, event_id: &str) -> Result<PairState> {
        match self.store.get_registration(user_id, event_id).await {
            Ok(r) if r.status == RegistrationStatus::Confirmed => Ok(PairState::Confirmed),
            Ok(_) => Ok(PairState::Waitlisted),
            Err(StoreError::NotFound(_)) => Ok(PairState::Absent),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort promotion of the waitlist head after a confirmed slot
    /// was freed. The unregister has already committed, so failures here
    /// are logged, never surfaced: the intermediate state (one free slot,
    /// non-empty waitlist) is legal and self-heals on the next departure.
    async fn promote_head(&self, mut event: Event) {
        for attempt in 1..=self.config.max_attempts {
            if event.waitlist.is_empty() || event.registered_count >= event.capacity {
                return;
            }
            let head = event.waitlist[0].clone();
            match self.store.tx_promote_head(&event.event_id, &head).await {
                Ok(committed) => {
                    info!(
                        event_id = %event.event_id,
                        user_id = %head,
                        registered_count = committed.registered_count,
                        waitlist_len = committed.waitlist.len(),
                        "promoted waitlist head"
                    );
                    return;
                }
                Err(StoreError::ConditionFailed(reason)) => {
                    // Head changed or left in the same window; refresh and
                    // try the new head.
                    debug!(event_id = %event.event_id, attempt, %reason, "promotion raced, re-reading");
                    match self.store.get_event(&event.event_id).await {
                        Ok(fresh) => event = fresh,
                        Err(_) => return,
                    }
                }
                Err(e) => {
                    warn!(event_id = %event.event_id, "promotion skipped: {e}");
                    return;
                }
            }
        }
        warn!(
            event_id = %event.event_id,
            "promotion retry budget exhausted; next unregister will heal the queue"
        );
    }
}
