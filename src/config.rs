use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub idempotency: IdempotencySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencySettings {
    /// How long a processed event stays authoritative.
    pub retention_seconds: i64,
    /// Sweep period; 0 disables the background sweep.
    pub sweep_interval_seconds: u64,
}

impl IdempotencySettings {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_seconds)
    }

    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        (self.sweep_interval_seconds > 0)
            .then(|| std::time::Duration::from_secs(self.sweep_interval_seconds))
    }
}

impl Settings {
    /// Loads defaults, then `config/default`, `config/local` and `APP__*`
    /// environment variables, later sources winning.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Built-in defaults every other source overrides.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("application.host", "0.0.0.0")?
            .set_default("application.port", 8080)?
            .set_default("application.log_level", "info")?
            .set_default("application.log_format", "pretty")?
            .set_default("idempotency.retention_seconds", 86_400)?
            .set_default("idempotency.sweep_interval_seconds", 300)
    }

    /// Builds settings from the defaults plus a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
