use std::time::Duration;

use actix_web::cookie::SameSite;

use crate::error::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub session_cache: SessionCacheSettings,
    #[serde(default)]
    pub cookie: CookieSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Answer unknown emails exactly like wrong passwords (401)
    #[serde(default)]
    pub uniform_credential_errors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
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

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    /// Lifetime for tokens signed without an explicit one
    #[serde(default = "default_token_expiry")]
    pub default_token_expiry: i64,
    pub issuer: String,
}

fn default_token_expiry() -> i64 {
    60 * 60 * 24 * 30
}

impl JwtSettings {
    /// Rejects empty or short secrets and non-positive lifetimes
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secret) in [
            ("jwt.access_token_secret", &self.access_token_secret),
            ("jwt.refresh_token_secret", &self.refresh_token_secret),
        ] {
            if secret.is_empty() {
                return Err(ConfigError::MissingRequired(name.to_string()));
            }
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be at least {} bytes",
                    name, MIN_SECRET_LENGTH
                )));
            }
        }

        for (name, seconds) in [
            ("jwt.access_token_expiry", self.access_token_expiry),
            ("jwt.refresh_token_expiry", self.refresh_token_expiry),
            ("jwt.default_token_expiry", self.default_token_expiry),
        ] {
            if seconds <= 0 {
                return Err(ConfigError::InvalidValue(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expiry.max(0) as u64)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiry.max(0) as u64)
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Postgres,
}

#[derive(serde::Deserialize, Clone)]
pub struct SessionCacheSettings {
    pub backend: CacheBackend,
    /// Seconds between purges of expired entries
    pub cleanup_interval: u64,
}

impl Default for SessionCacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Postgres,
            cleanup_interval: 60,
        }
    }
}

#[derive(serde::Deserialize, Clone)]
#[serde(default)]
pub struct CookieSettings {
    pub refresh_token_name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            refresh_token_name: "tc_refresh_token".to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: "lax".to_string(),
        }
    }
}

impl CookieSettings {
    pub fn same_site(&self) -> Result<SameSite, ConfigError> {
        match self.same_site.to_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(ConfigError::InvalidValue(format!(
                "cookie.same_site must be strict, lax or none (got {})",
                other
            ))),
        }
    }

    /// Checked form used by the server; built once at startup
    pub fn policy(&self) -> Result<CookiePolicy, ConfigError> {
        if self.refresh_token_name.is_empty() {
            return Err(ConfigError::MissingRequired(
                "cookie.refresh_token_name".to_string(),
            ));
        }
        Ok(CookiePolicy {
            refresh_token_name: self.refresh_token_name.clone(),
            path: self.path.clone(),
            http_only: self.http_only,
            secure: self.secure,
            same_site: self.same_site()?,
        })
    }
}

/// Refresh token cookie attributes after validation
#[derive(Debug, Clone, PartialEq)]
pub struct CookiePolicy {
    pub refresh_token_name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            refresh_token_name: "tc_refresh_token".to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.cookie.policy()?;
        if self.session_cache.cleanup_interval == 0 {
            return Err(ConfigError::InvalidValue(
                "session_cache.cleanup_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads `configuration.{yaml,toml,json}` from the working directory
/// (optional) and overlays `APP_*` environment variables,
/// e.g. `APP_JWT__ACCESS_TOKEN_SECRET`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
