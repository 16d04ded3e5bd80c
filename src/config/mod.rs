//! 設定モジュール
//!
//! 本モジュールはアプリ全体の設定値を表す型定義と、設定の読み込みロジックを提供します。
//! 読み込みの優先順位は次のとおりです（後勝ちで上書き）：
//! 1) `config/default.toml`
//! 2) `config/{profile}.toml`（例: production, staging。development 以外のときに適用）
//! 3) `config/local.toml`（ローカル開発者向けの上書き）
//! 4) 環境変数 `EVENTS__*`（例: `EVENTS__SERVER__PORT=3000`）
//! さらに `DATABASE_URL` は慣習どおり単独の環境変数としても受け付けます。

use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::services::EngineConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub environment: String,
    pub database: DatabaseConfig,
    pub engine: EngineSettings,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            environment: "development".to_string(),
            database: DatabaseConfig::default(),
            engine: EngineSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout applied by the HTTP layer, in seconds.
    pub request_timeout: u64,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from(Self::DEFAULT_HOST),
            port: Self::DEFAULT_PORT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; only ever logged masked.
    pub url: SecretString,
    pub max_connections: u32,
    pub enable_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::from("postgres://localhost/events".to_owned()),
            max_connections: 10,
            enable_migrations: true,
        }
    }
}

/// Registration engine tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Optimistic retry attempts per engine operation.
    pub max_attempts: u32,
    /// End-to-end deadline per engine operation, in seconds.
    pub op_deadline_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            op_deadline_secs: 5,
        }
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(s: &EngineSettings) -> Self {
        Self {
            max_attempts: s.max_attempts,
            op_deadline: Duration::from_secs(s.op_deadline_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,events_backend=debug,tower_http=debug".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// 環境変数と設定ファイルから `Config` を構築します。
    ///
    /// # Errors
    ///
    /// 設定ファイルの読み込みやデシリアライズ、または論理検証に失敗した
    /// 場合にエラーを返します。
    pub fn from_env() -> Result<Self, crate::AppError> {
        dotenvy::dotenv().ok();

        let profile = read_profile();
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));
        if profile != "development" {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{profile}")).required(false));
        }
        let raw = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("EVENTS").separator("__"))
            .build()?;

        let mut cfg: Self = raw.try_deserialize()?;
        cfg.environment = profile;

        if let Ok(url) = env::var("DATABASE_URL") {
            cfg.database.url = SecretString::from(url);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// 設定値が論理的に正しいか検証します。
    fn validate(&self) -> Result<(), crate::AppError> {
        if self.database.max_connections == 0 {
            return Err(crate::AppError::ConfigValidation(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.engine.max_attempts == 0 {
            return Err(crate::AppError::ConfigValidation(
                "engine.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.engine.op_deadline_secs == 0 {
            return Err(crate::AppError::ConfigValidation(
                "engine.op_deadline_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_profile() -> String {
    env::var("EVENTS_PROFILE").unwrap_or_else(|_| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, ServerConfig::DEFAULT_PORT);
        assert_eq!(cfg.engine.max_attempts, 5);
    }
}
