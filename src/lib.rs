//! Events Backend - Event Registration Core
//!
//! A server-side event-registration backend built with modern Rust
//! technologies:
//!
//! ## Architecture
//! - **axum + tower-http**: HTTP surface with permissive CORS, request ids
//!   and tracing
//! - **Registration engine**: atomic state transitions over users, event
//!   capacity counters and FIFO waitlists; optimistic retry on contention
//! - **Pluggable store**: in-memory backend by default, PostgreSQL +
//!   Diesel behind the `database` feature, with identical conditional
//!   transaction semantics
//! - **validator + serde**: canonicalising input validation with per-field
//!   error details
//! - **OpenAPI 3.0**: interactive documentation at `/swagger-ui`
//!
//! The engine is the sole writer of `registeredCount` and the waitlist;
//! every mutation of a `(Registration, Event)` pair is one atomic store
//! transaction, so the capacity invariants hold at every committed state.

// Core modules
pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

// Persistence and domain
pub mod models;
pub mod services;
pub mod store;

// API and web framework modules
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

// OpenAPI documentation system
pub mod openapi;

// Re-export core types for API
pub use app::{AppMetrics, AppState};
pub use config::Config;
pub use error::{AppError, Result};
