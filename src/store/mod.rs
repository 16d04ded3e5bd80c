//! ストア層
//!
//! 3 つのコレクション（Users / Events / Registrations)に対する型付き永続化
//! プリミティブを提供します。主な責務：
//! - 条件付き書き込みによる単一レコードの一意性保証
//! - 複数レコードを同時に動かす ACID トランザクション（`tx_*` 群）
//! - 一時的障害のバックオフ付きリトライ
//!
//! 設計メモ：
//! - すべての `tx_*` は「全て確定」か「全て未変更」のどちらかで終わる。
//!   部分的に観測可能な状態は許さない。
//! - 失敗は狭い種別（`ConditionFailed` / `NotFound` / `Duplicate` /
//!   `Transient`）へ正規化して上位層に伝播する。
//! - バックエンドはインメモリ実装と Postgres 実装（feature `database`）が
//!   1:1 のセマンティクスを持つ。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::warn;

use crate::models::{Event, EventPatch, Registration, User};

pub mod memory;

#[cfg(feature = "database")]
pub mod pool;
#[cfg(feature = "database")]
pub mod postgres;
#[cfg(feature = "database")]
pub mod schema;

pub use memory::MemoryStore;

/// The narrow failure taxonomy every backend normalises into.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write or transaction guard did not hold.
    #[error("condition failed: {0}")]
    ConditionFailed(String),
    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// An insert-if-absent hit an existing record.
    #[error("duplicate: {0}")]
    Duplicate(String),
    /// Network or server-side failure worth retrying.
    #[error("transient store failure: {0}")]
    Transient(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Shared handle used by services and the registration engine.
pub type SharedStore = Arc<dyn EventStore>;

/// Typed persistence operations over the three collections.
///
/// Conditional semantics are part of the contract: a backend that cannot
/// evaluate a condition atomically with its write must not implement this
/// trait. The `tx_*` operations mutate a `(Registration, Event)` pair in
/// one atomic step and return the committed event state.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Creates the user only if no record with that id exists.
    async fn put_user_if_absent(&self, user: User) -> StoreResult<User>;

    async fn get_user(&self, user_id: &str) -> StoreResult<User>;

    /// Unconditional put, used for event creation with fully initialised
    /// bookkeeping fields.
    async fn put_event(&self, event: Event) -> StoreResult<Event>;

    async fn get_event(&self, event_id: &str) -> StoreResult<Event>;

    /// Applies a patch that by construction cannot touch engine fields.
    async fn update_event_opaque(&self, event_id: &str, patch: EventPatch) -> StoreResult<Event>;

    async fn delete_event(&self, event_id: &str) -> StoreResult<()>;

    /// Full scan; callers filter.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn get_registration(&self, user_id: &str, event_id: &str) -> StoreResult<Registration>;

    async fn query_registrations_by_user(&self, user_id: &str) -> StoreResult<Vec<Registration>>;

    async fn query_registrations_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>>;

    /// Insert the registration and increment `registered_count`, guarded by
    /// `(userId,eventId)` absent and `registered_count < capacity`.
    async fn tx_register_confirmed(&self, registration: Registration) -> StoreResult<Event>;

    /// Insert the registration with waitlist status and append the user to
    /// the event waitlist, guarded by: record absent, event full, waitlist
    /// enabled, user not already queued, queue below [`crate::models::event::WAITLIST_CAP`].
    async fn tx_register_waitlist(&self, registration: Registration) -> StoreResult<Event>;

    /// Delete a confirmed registration and decrement `registered_count`
    /// (guard: record present with confirmed status, count > 0).
    async fn tx_unregister_confirmed(&self, user_id: &str, event_id: &str) -> StoreResult<Event>;

    /// Delete a waitlisted registration and remove the user from the
    /// waitlist preserving the order of the remaining entries.
    async fn tx_unregister_waitlist(&self, user_id: &str, event_id: &str) -> StoreResult<Event>;

    /// Promote the waitlist head: pop index 0, flip the registration to
    /// confirmed and increment `registered_count`. Guarded by
    /// `waitlist[0] == userId`, the registration still being waitlisted and
    /// a free confirmed slot.
    async fn tx_promote_head(&self, event_id: &str, user_id: &str) -> StoreResult<Event>;

    /// Cheap liveness probe for the health endpoint.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Retry policy for `Transient` failures: capped exponential backoff with
/// jitter. Condition failures and business errors are never retried here.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails non-transiently, or the attempt
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Err(StoreError::Transient(msg)) if attempt < self.attempts => {
                    let jitter_ms = rand::rng().random_range(0..=delay.as_millis() as u64 / 2);
                    warn!(
                        op = op_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64 + jitter_ms,
                        "transient store failure, backing off: {msg}"
                    );
                    tokio::time::sleep(delay + Duration::from_millis(jitter_ms)).await;
                    delay = (delay * 2).min(self.max_delay);
                }
                other => return other,
            }
        }
    }
}
