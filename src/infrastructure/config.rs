use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub realtime: RealtimeSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Pin the dashboard to one site instead of the first one listed
    #[serde(default)]
    pub site_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeSettings {
    pub url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub token_file: String,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RealtimeSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("api.base_url", "https://hiring-dev.internal.kloudspot.com/api")?
        .set_default("api.timeout_secs", 15)?
        .set_default("realtime.url", "https://hiring-dev.internal.kloudspot.com")?
        .set_default("realtime.reconnect_attempts", 5)?
        .set_default("realtime.reconnect_delay_ms", 1000)?
        .set_default("realtime.connect_timeout_ms", 5000)?
        .set_default("session.token_file", "state/session.toml")
}

/// Defaults, overlaid by `config/dashboard.toml` (optional), overlaid by
/// `DASHBOARD__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
