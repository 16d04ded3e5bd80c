//! OpenAPI documentation assembly.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::service_info,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::events::create_event,
        crate::handlers::events::list_events,
        crate::handlers::events::get_event,
        crate::handlers::events::update_event,
        crate::handlers::events::delete_event,
        crate::handlers::registrations::register_user,
        crate::handlers::registrations::unregister_user,
        crate::handlers::registrations::list_user_registrations,
        crate::handlers::registrations::register_for_event,
        crate::handlers::registrations::unregister_from_event,
        crate::handlers::registrations::list_event_registrations,
    ),
    components(schemas(
        crate::models::User,
        crate::models::CreateUserRequest,
        crate::models::Event,
        crate::models::EventResponse,
        crate::models::CreateEventRequest,
        crate::models::UpdateEventRequest,
        crate::models::Registration,
        crate::models::RegistrationStatus,
        crate::models::RegistrationOutcome,
        crate::models::RegisterRequest,
        crate::models::RegisterByEventRequest,
        crate::error::ValidationDetail,
    )),
    tags(
        (name = "Health", description = "Liveness and service info"),
        (name = "Users", description = "User management"),
        (name = "Events", description = "Event management with bounded capacity"),
        (name = "Registrations", description = "Registration engine: confirm, waitlist, promote")
    )
)]
pub struct ApiDoc;
