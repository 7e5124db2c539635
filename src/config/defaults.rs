pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: i64 = 8000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_DB_MAX_CONNECTIONS: i64 = 20;
pub const DEFAULT_DB_MIN_IDLE: i64 = 2;
pub const DEFAULT_DB_TIMEOUT_MS: i64 = 5_000;
pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TTL_MULTIPLIER: i64 = 100;
pub const DEFAULT_CACHE_TIMEOUT_MS: i64 = 500;
pub const DEFAULT_OAUTH_HTTP_TIMEOUT_MS: i64 = 5_000;
pub const DEFAULT_COOKIE_SECURE: bool = false;
