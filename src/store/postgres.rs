//! PostgreSQL backend (Diesel + r2d2).
//!
//! Semantics are 1:1 with the in-memory backend. Every `tx_*` operation
//! runs inside `conn.transaction` and takes the event row lock
//! (`SELECT ... FOR UPDATE`) before evaluating its conditions, so a guard
//! that held at check time still holds at write time. Lock order is always
//! event row first, then registration row.
//!
//! Transient failures (pool exhaustion, connection loss, serialization
//! aborts) are retried here with the store's backoff policy; the retried
//! transactions are safe to re-run because their guards reject a second
//! application.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use secrecy::ExposeSecret;

use crate::config::DatabaseConfig;
use crate::models::event::WAITLIST_CAP;
use crate::models::{Event, EventPatch, Registration, RegistrationStatus, User};

use super::pool::{DatabasePool, PooledConnection};
use super::schema;
use super::{EventStore, RetryPolicy, StoreError, StoreResult};

#[cfg(not(test))]
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

#[cfg(not(test))]
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Durable [`EventStore`] over PostgreSQL.
pub struct PgStore {
    pool: DatabasePool,
    retry: RetryPolicy,
}

/// Error type used inside transaction closures: either one of our typed
/// failures (forces a rollback) or a raw Diesel error to normalise at the
/// boundary.
enum TxError {
    Store(StoreError),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Diesel(err)
    }
}

/// Normalise Diesel errors into the narrow store taxonomy.
fn map_diesel(err: diesel::result::Error, ctx: &str) -> StoreError {
    match err {
        diesel::result::Error::NotFound => StoreError::NotFound(ctx.to_string()),
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Duplicate(ctx.to_string())
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
            StoreError::Transient(format!("{ctx}: serialization failure: {}", info.message()))
        }
        other => StoreError::Transient(format!("{ctx}: {other}")),
    }
}

fn unwrap_tx(err: TxError, ctx: &str) -> StoreError {
    match err {
        TxError::Store(e) => e,
        TxError::Diesel(e) => map_diesel(e, ctx),
    }
}

/// Lock and load the event row, mapping a missing row to `NotFound`.
fn lock_event(conn: &mut PooledConnection, event_id: &str) -> Result<EventRow, TxError> {
    use schema::events::dsl as events_dsl;
    events_dsl::events
        .find(event_id)
        .for_update()
        .first::<EventRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => {
                TxError::Store(StoreError::NotFound(format!("event {event_id}")))
            }
            other => TxError::Diesel(other),
        })
}

/// Lock and load the registration row if present.
fn lock_registration(
    conn: &mut PooledConnection,
    user_id: &str,
    event_id: &str,
) -> Result<Option<RegistrationRow>, TxError> {
    use schema::registrations::dsl as reg_dsl;
    reg_dsl::registrations
        .find((user_id, event_id))
        .for_update()
        .first::<RegistrationRow>(conn)
        .optional()
        .map_err(TxError::Diesel)
}

fn condition_failed(msg: String) -> TxError {
    TxError::Store(StoreError::ConditionFailed(msg))
}

//--- Row mapping ---//

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = schema::users)]
struct UserRow {
    user_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<User> for UserRow {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            name: u.name,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            user_id: r.user_id,
            name: r.name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = schema::events)]
struct EventRow {
    event_id: String,
    title: Option<String>,
    description: Option<String>,
    event_date: Option<DateTime<Utc>>,
    location: Option<String>,
    organizer: Option<String>,
    status: String,
    capacity: i32,
    registered_count: i32,
    waitlist_enabled: bool,
    waitlist: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Event> for EventRow {
    fn from(e: Event) -> Self {
        Self {
            event_id: e.event_id,
            title: e.title,
            description: e.description,
            event_date: e.date,
            location: e.location,
            organizer: e.organizer,
            status: e.status,
            capacity: e.capacity,
            registered_count: e.registered_count,
            waitlist_enabled: e.waitlist_enabled,
            waitlist: e.waitlist,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Self {
            event_id: r.event_id,
            title: r.title,
            description: r.description,
            date: r.event_date,
            location: r.location,
            organizer: r.organizer,
            status: r.status,
            capacity: r.capacity,
            registered_count: r.registered_count,
            waitlist_enabled: r.waitlist_enabled,
            waitlist: r.waitlist,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = schema::registrations)]
struct RegistrationRow {
    user_id: String,
    event_id: String,
    status: String,
    registered_at: DateTime<Utc>,
    event_title: Option<String>,
    event_date: Option<DateTime<Utc>>,
}

impl From<Registration> for RegistrationRow {
    fn from(r: Registration) -> Self {
        Self {
            user_id: r.user_id,
            event_id: r.event_id,
            status: r.status.as_str().to_string(),
            registered_at: r.registered_at,
            event_title: r.event_title,
            event_date: r.event_date,
        }
    }
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(r: RegistrationRow) -> Result<Self, Self::Error> {
        let status = RegistrationStatus::parse_str(&r.status)
            .map_err(|s| StoreError::Transient(format!("corrupt registration status: {s}")))?;
        Ok(Self {
            user_id: r.user_id,
            event_id: r.event_id,
            status,
            registered_at: r.registered_at,
            event_title: r.event_title,
            event_date: r.event_date,
        })
    }
}

/// Opaque-field changeset; `None` fields are left untouched.
#[derive(AsChangeset)]
#[diesel(table_name = schema::events)]
struct EventOpaqueChangeset {
    title: Option<String>,
    description: Option<String>,
    event_date: Option<DateTime<Utc>>,
    location: Option<String>,
    organizer: Option<String>,
    status: Option<String>,
    updated_at: DateTime<Utc>,
}

//--- Store implementation ---//

impl PgStore {
    /// Build the pool and run pending migrations.
    ///
    /// # Errors
    /// Fails when the pool cannot be created or migrations cannot be
    /// applied.
    pub fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = DatabasePool::new(config.url.expose_secret(), config.max_connections)?;

        #[cfg(not(test))]
        if config.enable_migrations {
            let mut conn = pool.get()?;
            conn.run_pending_migrations(MIGRATIONS)
                .map_err(|e| StoreError::Transient(format!("failed to run migrations: {e}")))?;
        }

        Ok(Self {
            pool,
            retry: RetryPolicy::default(),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PooledConnection) -> StoreResult<T>,
    {
        let mut conn = self.pool.get()?;
        f(&mut conn)
    }

    fn in_tx<T, F>(&self, ctx: &str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PooledConnection) -> Result<T, TxError>,
    {
        self.with_conn(|conn| {
            conn.transaction::<T, TxError, _>(|conn| f(conn))
                .map_err(|e| unwrap_tx(e, ctx))
        })
    }
}

#[async_trait::async_trait]
impl EventStore for PgStore {
    async fn put_user_if_absent(&self, user: User) -> StoreResult<User> {
        use schema::users::dsl as users_dsl;
        self.retry
            .run("put_user_if_absent", || {
                let user = user.clone();
                async move {
                    self.with_conn(|conn| {
                        diesel::insert_into(users_dsl::users)
                            .values(UserRow::from(user.clone()))
                            .execute(conn)
                            .map_err(|e| map_diesel(e, &format!("user {}", user.user_id)))?;
                        Ok(user)
                    })
                }
            })
            .await
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        use schema::users::dsl as users_dsl;
        self.retry
            .run("get_user", || async move {
                self.with_conn(|conn| {
                    users_dsl::users
                        .find(user_id)
                        .first::<UserRow>(conn)
                        .map(User::from)
                        .map_err(|e| map_diesel(e, &format!("user {user_id}")))
                })
            })
            .await
    }

    async fn put_event(&self, event: Event) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        self.retry
            .run("put_event", || {
                let event = event.clone();
                async move {
                    self.with_conn(|conn| {
                        let row = EventRow::from(event.clone());
                        diesel::insert_into(events_dsl::events)
                            .values(row.clone())
                            .on_conflict(events_dsl::event_id)
                            .do_update()
                            .set(row)
                            .execute(conn)
                            .map_err(|e| map_diesel(e, &format!("event {}", event.event_id)))?;
                        Ok(event)
                    })
                }
            })
            .await
    }

    async fn get_event(&self, event_id: &str) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        self.retry
            .run("get_event", || async move {
                self.with_conn(|conn| {
                    events_dsl::events
                        .find(event_id)
                        .first::<EventRow>(conn)
                        .map(Event::from)
                        .map_err(|e| map_diesel(e, &format!("event {event_id}")))
                })
            })
            .await
    }

    async fn update_event_opaque(&self, event_id: &str, patch: EventPatch) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        let ctx = format!("event {event_id}");
        self.retry
            .run("update_event_opaque", || {
                let patch = patch.clone();
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        lock_event(conn, event_id)?;
                        let updated: EventRow = diesel::update(events_dsl::events.find(event_id))
                            .set(EventOpaqueChangeset {
                                title: patch.title,
                                description: patch.description,
                                event_date: patch.date,
                                location: patch.location,
                                organizer: patch.organizer,
                                status: patch.status,
                                updated_at: Utc::now(),
                            })
                            .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn delete_event(&self, event_id: &str) -> StoreResult<()> {
        use schema::events::dsl as events_dsl;
        self.retry
            .run("delete_event", || async move {
                self.with_conn(|conn| {
                    let affected = diesel::delete(events_dsl::events.find(event_id))
                        .execute(conn)
                        .map_err(|e| map_diesel(e, &format!("event {event_id}")))?;
                    if affected == 0 {
                        return Err(StoreError::NotFound(format!("event {event_id}")));
                    }
                    Ok(())
                })
            })
            .await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        use schema::events::dsl as events_dsl;
        self.retry
            .run("list_events", || async move {
                self.with_conn(|conn| {
                    events_dsl::events
                        .load::<EventRow>(conn)
                        .map(|rows| rows.into_iter().map(Event::from).collect())
                        .map_err(|e| map_diesel(e, "events"))
                })
            })
            .await
    }

    async fn get_registration(&self, user_id: &str, event_id: &str) -> StoreResult<Registration> {
        use schema::registrations::dsl as reg_dsl;
        self.retry
            .run("get_registration", || async move {
                self.with_conn(|conn| {
                    let row = reg_dsl::registrations
                        .find((user_id, event_id))
                        .first::<RegistrationRow>(conn)
                        .map_err(|e| {
                            map_diesel(e, &format!("registration {user_id}/{event_id}"))
                        })?;
                    Registration::try_from(row)
                })
            })
            .await
    }

    async fn query_registrations_by_user(&self, user_id: &str) -> StoreResult<Vec<Registration>> {
        use schema::registrations::dsl as reg_dsl;
        self.retry
            .run("query_registrations_by_user", || async move {
                self.with_conn(|conn| {
                    let rows = reg_dsl::registrations
                        .filter(reg_dsl::user_id.eq(user_id))
                        .load::<RegistrationRow>(conn)
                        .map_err(|e| map_diesel(e, &format!("registrations of user {user_id}")))?;
                    rows.into_iter().map(Registration::try_from).collect()
                })
            })
            .await
    }

    async fn query_registrations_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>> {
        use schema::registrations::dsl as reg_dsl;
        self.retry
            .run("query_registrations_by_event", || async move {
                self.with_conn(|conn| {
                    let rows = reg_dsl::registrations
                        .filter(reg_dsl::event_id.eq(event_id))
                        .load::<RegistrationRow>(conn)
                        .map_err(|e| map_diesel(e, &format!("registrations of event {event_id}")))?;
                    rows.into_iter().map(Registration::try_from).collect()
                })
            })
            .await
    }

    async fn tx_register_confirmed(&self, registration: Registration) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        use schema::registrations::dsl as reg_dsl;
        let ctx = format!(
            "registration {}/{}",
            registration.user_id, registration.event_id
        );
        self.retry
            .run("tx_register_confirmed", || {
                let registration = registration.clone();
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        let event = lock_event(conn, &registration.event_id)?;
                        if event.registered_count >= event.capacity {
                            return Err(condition_failed(format!(
                                "event {} has no free confirmed slot",
                                event.event_id
                            )));
                        }
                        diesel::insert_into(reg_dsl::registrations)
                            .values(RegistrationRow::from(registration.clone()))
                            .execute(conn)?;
                        let updated: EventRow =
                            diesel::update(events_dsl::events.find(&registration.event_id))
                                .set((
                                    events_dsl::registered_count
                                        .eq(event.registered_count + 1),
                                    events_dsl::updated_at.eq(Utc::now()),
                                ))
                                .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn tx_register_waitlist(&self, registration: Registration) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        use schema::registrations::dsl as reg_dsl;
        let ctx = format!(
            "registration {}/{}",
            registration.user_id, registration.event_id
        );
        self.retry
            .run("tx_register_waitlist", || {
                let registration = registration.clone();
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        let event = lock_event(conn, &registration.event_id)?;
                        if event.registered_count != event.capacity {
                            return Err(condition_failed(format!(
                                "event {} is not full, waitlist append refused",
                                event.event_id
                            )));
                        }
                        if !event.waitlist_enabled {
                            return Err(condition_failed(format!(
                                "event {} has no waitlist",
                                event.event_id
                            )));
                        }
                        if event.waitlist.iter().any(|u| u == &registration.user_id) {
                            return Err(condition_failed(format!(
                                "user {} already queued on event {}",
                                registration.user_id, event.event_id
                            )));
                        }
                        if event.waitlist.len() >= WAITLIST_CAP {
                            return Err(condition_failed(format!(
                                "event {} waitlist is at capacity",
                                event.event_id
                            )));
                        }
                        diesel::insert_into(reg_dsl::registrations)
                            .values(RegistrationRow::from(registration.clone()))
                            .execute(conn)?;
                        let mut waitlist = event.waitlist.clone();
                        waitlist.push(registration.user_id.clone());
                        let updated: EventRow =
                            diesel::update(events_dsl::events.find(&registration.event_id))
                                .set((
                                    events_dsl::waitlist.eq(waitlist),
                                    events_dsl::updated_at.eq(Utc::now()),
                                ))
                                .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn tx_unregister_confirmed(&self, user_id: &str, event_id: &str) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        use schema::registrations::dsl as reg_dsl;
        let ctx = format!("registration {user_id}/{event_id}");
        self.retry
            .run("tx_unregister_confirmed", || {
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        let event = lock_event(conn, event_id)?;
                        let reg = lock_registration(conn, user_id, event_id)?;
                        match reg {
                            Some(r) if r.status == RegistrationStatus::Confirmed.as_str() => {}
                            Some(_) => {
                                return Err(condition_failed(format!(
                                    "registration {user_id}/{event_id} is not confirmed"
                                )))
                            }
                            None => {
                                return Err(condition_failed(format!(
                                    "registration {user_id}/{event_id} no longer exists"
                                )))
                            }
                        }
                        if event.registered_count <= 0 {
                            return Err(condition_failed(format!(
                                "event {event_id} has no confirmed registrations to release"
                            )));
                        }
                        diesel::delete(reg_dsl::registrations.find((user_id, event_id)))
                            .execute(conn)?;
                        let updated: EventRow = diesel::update(events_dsl::events.find(event_id))
                            .set((
                                events_dsl::registered_count.eq(event.registered_count - 1),
                                events_dsl::updated_at.eq(Utc::now()),
                            ))
                            .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn tx_unregister_waitlist(&self, user_id: &str, event_id: &str) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        use schema::registrations::dsl as reg_dsl;
        let ctx = format!("registration {user_id}/{event_id}");
        self.retry
            .run("tx_unregister_waitlist", || {
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        let event = lock_event(conn, event_id)?;
                        let reg = lock_registration(conn, user_id, event_id)?;
                        match reg {
                            Some(r) if r.status == RegistrationStatus::Waitlist.as_str() => {}
                            Some(_) => {
                                return Err(condition_failed(format!(
                                    "registration {user_id}/{event_id} is not waitlisted"
                                )))
                            }
                            None => {
                                return Err(condition_failed(format!(
                                    "registration {user_id}/{event_id} no longer exists"
                                )))
                            }
                        }
                        let Some(position) =
                            event.waitlist.iter().position(|u| u == user_id)
                        else {
                            return Err(condition_failed(format!(
                                "user {user_id} is not on the waitlist of event {event_id}"
                            )));
                        };
                        diesel::delete(reg_dsl::registrations.find((user_id, event_id)))
                            .execute(conn)?;
                        let mut waitlist = event.waitlist.clone();
                        waitlist.remove(position);
                        let updated: EventRow = diesel::update(events_dsl::events.find(event_id))
                            .set((
                                events_dsl::waitlist.eq(waitlist),
                                events_dsl::updated_at.eq(Utc::now()),
                            ))
                            .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn tx_promote_head(&self, event_id: &str, user_id: &str) -> StoreResult<Event> {
        use schema::events::dsl as events_dsl;
        use schema::registrations::dsl as reg_dsl;
        let ctx = format!("registration {user_id}/{event_id}");
        self.retry
            .run("tx_promote_head", || {
                let ctx = ctx.clone();
                async move {
                    self.in_tx(&ctx, |conn| {
                        let event = lock_event(conn, event_id)?;
                        if event.waitlist.first().map(String::as_str) != Some(user_id) {
                            return Err(condition_failed(format!(
                                "user {user_id} is not at the head of the waitlist of event {event_id}"
                            )));
                        }
                        if event.registered_count >= event.capacity {
                            return Err(condition_failed(format!(
                                "event {event_id} has no free slot for promotion"
                            )));
                        }
                        let reg = lock_registration(conn, user_id, event_id)?;
                        match reg {
                            Some(r) if r.status == RegistrationStatus::Waitlist.as_str() => {}
                            _ => {
                                return Err(condition_failed(format!(
                                    "registration {user_id}/{event_id} is not awaiting promotion"
                                )))
                            }
                        }
                        diesel::update(reg_dsl::registrations.find((user_id, event_id)))
                            .set(reg_dsl::status.eq(RegistrationStatus::Confirmed.as_str()))
                            .execute(conn)?;
                        let mut waitlist = event.waitlist.clone();
                        waitlist.remove(0);
                        let updated: EventRow = diesel::update(events_dsl::events.find(event_id))
                            .set((
                                events_dsl::waitlist.eq(waitlist),
                                events_dsl::registered_count
                                    .eq(event.registered_count + 1),
                                events_dsl::updated_at.eq(Utc::now()),
                            ))
                            .get_result(conn)?;
                        Ok(Event::from(updated))
                    })
                }
            })
            .await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            diesel::sql_query("SELECT 1")
                .execute(conn)
                .map(|_| ())
                .map_err(|e| StoreError::Transient(format!("health check failed: {e}")))
        })
    }
}
