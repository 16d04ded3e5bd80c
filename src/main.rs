use events_backend::{routes, telemetry, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    telemetry::init_telemetry(&config.logging)?;

    info!(
        "🚀 Starting {} v{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config).await?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("✅ Listening on {addr}");
    info!("📚 Swagger UI available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("👋 Shutdown signal received, draining connections");
}
