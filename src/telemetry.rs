use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured default filter, so operators can
/// raise verbosity without touching configuration files.
///
/// # Errors
///
/// 初期化過程（環境変数の解析やロガー構築）でエラーが発生した場合にエラーを返します。
pub fn init_telemetry(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .json(), // Structured logging for production
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}
