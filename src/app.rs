//! Application State and Service Management
//!
//! Centralized application state wiring the store backend, the user and
//! event services and the registration engine, plus lightweight metrics
//! the engine surfaces for operators.

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    CreateEventRequest, CreateUserRequest, EventResponse, Registration, RegistrationOutcome,
    RegistrationStatus, UpdateEventRequest, User,
};
use crate::services::{EventService, RegistrationEngine, UserService};
use crate::store::SharedStore;
use crate::AppError;

use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tokio::sync::RwLock;
use tracing::info;

/// Central application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend; the single shared resource.
    pub store: SharedStore,

    /// User management service.
    pub users: UserService,

    /// Event management service.
    pub events: EventService,

    /// The registration engine; sole writer of capacity bookkeeping.
    pub registrations: RegistrationEngine,

    /// Application configuration.
    pub config: Arc<Config>,

    /// Counters surfaced on the health endpoint.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Application start time for uptime calculations.
    pub start_time: Instant,
}

/// Engine-level counters for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppMetrics {
    pub registrations_confirmed: u64,
    pub registrations_waitlisted: u64,
    pub unregistrations: u64,
    pub contention_errors: u64,
}

/// Aggregated health report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub store: String,
    pub uptime_seconds: u64,
    pub metrics: AppMetrics,
}

impl AppState {
    /// Initialize the application state from configuration.
    ///
    /// # Errors
    /// Fails when the store backend cannot be initialised.
    pub async fn from_config(config: Config) -> Result<Self> {
        info!("🔧 Initializing application state");

        #[cfg(feature = "database")]
        let store: SharedStore = {
            info!("🗄️ Connecting to PostgreSQL store...");
            let store = crate::store::postgres::PgStore::new(&config.database)
                .map_err(|e| AppError::Internal(format!("store initialisation failed: {e}")))?;
            info!("✅ PostgreSQL store ready");
            Arc::new(store)
        };

        #[cfg(not(feature = "database"))]
        let store: SharedStore = {
            info!("🗄️ Using in-memory store (no `database` feature)");
            Arc::new(crate::store::MemoryStore::new())
        };

        Ok(Self::with_store(config, store))
    }

    /// Wire the services around an existing store handle. Used directly by
    /// the test suite with the in-memory backend.
    #[must_use]
    pub fn with_store(config: Config, store: SharedStore) -> Self {
        let engine_config = (&config.engine).into();
        Self {
            users: UserService::new(store.clone()),
            events: EventService::new(store.clone()),
            registrations: RegistrationEngine::new(store.clone(), engine_config),
            store,
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Aggregate health of the store plus engine counters.
    pub async fn health_check(&self) -> HealthStatus {
        let store = match self.store.health_check().await {
            Ok(()) => "up".to_string(),
            Err(e) => format!("down: {e}"),
        };
        HealthStatus {
            status: if store == "up" { "healthy" } else { "degraded" }.to_string(),
            store,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            metrics: self.metrics.read().await.clone(),
        }
    }

    //--- Service delegates used by the handlers ---//

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        self.users.create(request).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.users.get(user_id).await
    }

    pub async fn create_event(&self, request: CreateEventRequest) -> Result<EventResponse> {
        self.events.create(request).await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventResponse> {
        self.events.get(event_id).await
    }

    pub async fn list_events(&self, status: Option<String>) -> Result<Vec<EventResponse>> {
        self.events.list(status).await
    }

    pub async fn update_event(
        &self,
        event_id: &str,
        request: UpdateEventRequest,
    ) -> Result<EventResponse> {
        self.events.update(event_id, request).await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        self.events.delete(event_id).await
    }

    /// Register and record the outcome in the engine counters.
    pub async fn register(&self, user_id: &str, event_id: &str) -> Result<RegistrationOutcome> {
        let outcome = self.registrations.register(user_id, event_id).await;
        let mut metrics = self.metrics.write().await;
        match &outcome {
            Ok(o) if o.registration.status == RegistrationStatus::Confirmed => {
                metrics.registrations_confirmed += 1;
            }
            Ok(_) => metrics.registrations_waitlisted += 1,
            Err(AppError::Contention(_)) => metrics.contention_errors += 1,
            Err(_) => {}
        }
        outcome
    }

    pub async fn unregister(&self, user_id: &str, event_id: &str) -> Result<()> {
        let result = self.registrations.unregister(user_id, event_id).await;
        let mut metrics = self.metrics.write().await;
        match &result {
            Ok(()) => metrics.unregistrations += 1,
            Err(AppError::Contention(_)) => metrics.contention_errors += 1,
            Err(_) => {}
        }
        result
    }

    pub async fn user_registrations(&self, user_id: &str) -> Result<Vec<Registration>> {
        self.registrations.list_for_user(user_id).await
    }

    pub async fn event_registrations(&self, event_id: &str) -> Result<Vec<Registration>> {
        self.registrations.list_for_event(event_id).await
    }
}
