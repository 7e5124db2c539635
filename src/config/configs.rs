use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: Option<AuthConfig>,
    pub cache: CacheConfig,
    pub oauth: OAuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT as u16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
    /// Deadline applied to every database-bound step of a session operation.
    #[serde(default = "default_db_timeout_ms")]
    pub timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_db_max_connections(),
            min_idle: default_db_min_idle(),
            timeout_ms: default_db_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    /// Refresh tokens live this many times longer than access tokens.
    #[serde(default = "default_refresh_ttl_multiplier")]
    pub refresh_ttl_multiplier: i32,
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    #[serde(default)]
    pub superuser_login: Option<String>,
    #[serde(default)]
    pub superuser_password: Option<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_algorithm: default_jwt_algorithm(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_multiplier: default_refresh_ttl_multiplier(),
            cookie_secure: default_cookie_secure(),
            superuser_login: None,
            superuser_password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// In-memory revocation cache is used when unset.
    pub redis_url: Option<String>,
    pub timeout_ms: u64,
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            timeout_ms: defaults::DEFAULT_CACHE_TIMEOUT_MS as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthConfig {
    pub http_timeout_ms: u64,
    pub yandex: Option<OAuthClientConfig>,
    pub google: Option<OAuthClientConfig>,
}

impl OAuthConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            http_timeout_ms: defaults::DEFAULT_OAUTH_HTTP_TIMEOUT_MS as u64,
            yandex: None,
            google: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS as u32
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE as u32
}

fn default_db_timeout_ms() -> u64 {
    defaults::DEFAULT_DB_TIMEOUT_MS as u64
}

fn default_jwt_algorithm() -> String {
    defaults::DEFAULT_JWT_ALGORITHM.to_string()
}

fn default_access_ttl_minutes() -> i64 {
    defaults::DEFAULT_ACCESS_TTL_MINUTES
}

fn default_refresh_ttl_multiplier() -> i32 {
    defaults::DEFAULT_REFRESH_TTL_MULTIPLIER as i32
}

fn default_cookie_secure() -> bool {
    defaults::DEFAULT_COOKIE_SECURE
}
