//! Routes - HTTP ルーター定義
//!
//! アプリケーション全体のルーティング構成を提供します。
//! ユーザー / イベント / 登録の各エンドポイントとヘルスチェック、
//! ドキュメント (Swagger UI) を統合します。登録ルートはユーザー視点と
//! イベント視点のエイリアスを両方公開し、同じレコードを操作します。

use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, events, health, registrations, users};
use crate::middleware::request_context;
use crate::openapi::ApiDoc;
use crate::AppState;

/// メインルーターを作成
pub fn create_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout);

    let user_routes: Router<AppState> = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route(
            "/users/{user_id}/registrations",
            post(registrations::register_user).get(registrations::list_user_registrations),
        )
        .route(
            "/users/{user_id}/registrations/{event_id}",
            delete(registrations::unregister_user),
        );

    let event_routes: Router<AppState> = Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/{event_id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/{event_id}/registrations",
            post(registrations::register_for_event).get(registrations::list_event_registrations),
        )
        .route(
            "/events/{event_id}/registrations/{user_id}",
            delete(registrations::unregister_from_event),
        );

    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .merge(user_routes)
        .merge(event_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::not_found)
        .layer(TimeoutLayer::new(request_timeout))
        // Envelope completion must run inside CORS so rebuilt error
        // responses still pick up the CORS headers.
        .layer(axum_middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::Config;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let state = AppState::with_store(Config::default(), Arc::new(MemoryStore::new()));
        let _router = create_router(state);
    }
}
