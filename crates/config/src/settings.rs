use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub notifier: NotifierSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

/// Outbound email for case creation and closure.
///
/// `api_url` points at a JSON mail-send endpoint (SendGrid v3 compatible).
/// With `enabled = false` the notifier logs and skips delivery.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierSettings {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("REALTYDESK")
                    .list_separator(",")
                    .with_list_parse_key("notifier.recipients")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8081)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27019")?
            .set_default("database.name", "realtydesk")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "realtydesk")?
            .set_default("notifier.enabled", false)?
            .set_default("notifier.api_url", "https://api.sendgrid.com/v3/mail/send")?
            .set_default("notifier.api_key", None::<String>)?
            .set_default("notifier.from", "noreply@realtydesk.local")?
            .set_default("notifier.recipients", Vec::<String>::new())?
            .set_default("notifier.timeout_secs", 10)?
            .build()?;

        config.try_deserialize()
    }
}
