//! Service layer: user management, event management and the registration
//! engine. Services are stateless beyond their store handle and
//! configuration; all coordination happens through the store's conditional
//! writes and transactions.

pub mod events;
pub mod registrations;
pub mod users;

pub use events::EventService;
pub use registrations::{EngineConfig, RegistrationEngine};
pub use users::UserService;
