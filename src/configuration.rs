use chrono::Duration;

use crate::auth::DEFAULT_REFRESH_TOKEN_TTL_DAYS;
use crate::error::ConfigError;

pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = DEFAULT_REFRESH_TOKEN_TTL_DAYS * 24 * 60 * 60;
pub const MIN_SECRET_LENGTH: usize = 32;

// Values that have appeared in sample configs and must never sign tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-in-production", "changeme", "secret"];

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT authentication settings
///
/// The secret is read once at startup and handed to the auth service; nothing
/// else reads it.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (3600 = 1 hour)
    pub refresh_token_expiry: i64, // seconds (5184000 = 60 days)
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.secret.trim();
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if PLACEHOLDER_SECRETS.contains(&secret) {
            return Err(ConfigError::InvalidValue(
                "jwt.secret is a placeholder; set APP_JWT__SECRET".to_string(),
            ));
        }
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional) and `APP_*` env vars.
///
/// Nested keys use a double underscore: `APP_JWT__SECRET`, `APP_APPLICATION__PORT`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("jwt.access_token_expiry", DEFAULT_ACCESS_TOKEN_EXPIRY)?
        .set_default("jwt.refresh_token_expiry", DEFAULT_REFRESH_TOKEN_EXPIRY)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
