use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub webhook: WebhookConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
    pub source_name: String,
    pub request_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub auth_token: String,
    pub request_timeout: u64,
    pub app_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // PROMOSHARE__WEBHOOK__URL and friends
            .add_source(Environment::with_prefix("PROMOSHARE").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults only; no files, no environment, no validation.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.shutdown_timeout", 10)?
            .set_default("database.url", "sqlite://promoshare.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("feed.base_url", "https://api.divulgadorinteligente.com")?
            .set_default("feed.source_name", "promoshare")?
            .set_default("feed.request_timeout", 30)?
            .set_default("feed.retry_attempts", 2)?
            .set_default("feed.retry_delay_ms", 500)?
            .set_default("webhook.url", "http://localhost:5678/webhook/promoshare")?
            .set_default("webhook.auth_token", "")?
            .set_default("webhook.request_timeout", 30)?
            .set_default("webhook.app_tag", "PromoShare")?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.poll_interval_secs", 60)?
            .set_default("logging.level", "promoshare_relay=info")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9001)
    }

    /// Plain variable names shared with the gateway's `.env` file.
    fn apply_legacy_env(&mut self) {
        if let Ok(url) = env::var("WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Ok(token) = env::var("WEBHOOK_AUTH_TOKEN") {
            self.webhook.auth_token = token;
        }
        if let Ok(base_url) = env::var("EXTERNAL_API_BASE_URL") {
            self.feed.base_url = base_url;
        }
        if let Ok(db_url) = env::var("DATABASE_URL") {
            self.database.url = db_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("Database url must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message("Database min_connections cannot exceed max_connections".into()));
        }

        if Url::parse(&self.feed.base_url).is_err() {
            return Err(ConfigError::Message("Invalid feed base_url format".into()));
        }

        if self.feed.source_name.trim().is_empty() {
            return Err(ConfigError::Message("Feed source_name must not be empty".into()));
        }

        if self.feed.request_timeout == 0 {
            return Err(ConfigError::Message("Feed request_timeout must be greater than 0".into()));
        }

        if Url::parse(&self.webhook.url).is_err() {
            return Err(ConfigError::Message("Invalid webhook url format".into()));
        }

        if self.webhook.auth_token.trim().is_empty() {
            return Err(ConfigError::Message("Webhook auth_token must be set".into()));
        }

        if self.webhook.request_timeout == 0 {
            return Err(ConfigError::Message("Webhook request_timeout must be greater than 0".into()));
        }

        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler poll_interval_secs must be greater than 0".into()));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
