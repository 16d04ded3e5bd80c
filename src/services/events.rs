//! Event management operations.
//!
//! Creation initialises the capacity bookkeeping fields; updates go
//! through the opaque-field patch so this service can never touch
//! `registered_count` or the waitlist. Those belong to the registration
//! engine.

use tracing::info;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{CreateEventRequest, Event, EventResponse, UpdateEventRequest};
use crate::store::{SharedStore, StoreError};

#[derive(Clone)]
pub struct EventService {
    store: SharedStore,
}

impl EventService {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// イベントを作成します。
    ///
    /// # Errors
    ///
    /// 入力検証に失敗した場合にエラーを返します。
    pub async fn create(&self, request: CreateEventRequest) -> Result<EventResponse> {
        request.validate()?;
        let event = request.into_event();
        let created = self.store.put_event(event).await?;
        info!(
            event_id = %created.event_id,
            capacity = created.capacity,
            waitlist_enabled = created.waitlist_enabled,
            "event created"
        );
        Ok(EventResponse::from(created))
    }

    /// イベントを取得します（空き枠・待機列長の計算値つき）。
    ///
    /// # Errors
    ///
    /// 見つからない場合にエラーを返します。
    pub async fn get(&self, event_id: &str) -> Result<EventResponse> {
        self.fetch(event_id).await.map(EventResponse::from)
    }

    /// イベント一覧を取得します。`status` が与えられた場合はその値で
    /// 絞り込みます。順序は保証しません。
    ///
    /// # Errors
    ///
    /// 取得処理に失敗した場合にエラーを返します。
    pub async fn list(&self, status: Option<String>) -> Result<Vec<EventResponse>> {
        let events = self.store.list_events().await?;
        Ok(events
            .into_iter()
            .filter(|e| status.as_deref().is_none_or(|s| e.status == s))
            .map(EventResponse::from)
            .collect())
    }

    /// Patch opaque fields only; any engine field in the body is rejected
    /// as a validation error.
    ///
    /// # Errors
    /// Fails with a validation error for engine fields or bound
    /// violations, and with not-found for an unknown event.
    pub async fn update(
        &self,
        event_id: &str,
        request: UpdateEventRequest,
    ) -> Result<EventResponse> {
        request.validate()?;
        request.ensure_opaque_only()?;
        let updated = self
            .store
            .update_event_opaque(event_id, request.into_patch())
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AppError::EventNotFound(event_id.to_string()),
                other => other.into(),
            })?;
        Ok(EventResponse::from(updated))
    }

    /// イベントを削除します。登録が残っている場合の扱いは呼び出し側の
    /// 責務です。
    ///
    /// # Errors
    ///
    /// 見つからない場合にエラーを返します。
    pub async fn delete(&self, event_id: &str) -> Result<()> {
        self.store.delete_event(event_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::EventNotFound(event_id.to_string()),
            other => other.into(),
        })?;
        info!(event_id = %event_id, "event deleted");
        Ok(())
    }

    pub(crate) async fn fetch(&self, event_id: &str) -> Result<Event> {
        self.store.get_event(event_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::EventNotFound(event_id.to_string()),
            other => other.into(),
        })
    }
}
