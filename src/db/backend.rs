use std::time::Duration;

use anyhow::{Result, anyhow};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    sea_query::{IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder},
};

use crate::config::DatabaseConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backends the session store runs on, picked from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        let normalized = url.trim().to_ascii_lowercase();
        if normalized.starts_with("postgres://") || normalized.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if normalized.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            Err(anyhow!(
                "unsupported database url '{}'; expected postgres://, postgresql:// or sqlite:",
                redact_url(url)
            ))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Every connection to an in-memory SQLite URL opens its own empty database,
    /// so such pools hold exactly one.
    fn pool_size(self, cfg: &DatabaseConfig) -> u32 {
        match self {
            Backend::Sqlite if is_in_memory(&cfg.url) => 1,
            _ => cfg.max_connections,
        }
    }

    /// Acquiring a connection is bounded by the same deadline session operations use.
    /// SQLite pragmas are set on every pooled connection as it opens.
    fn options(self, cfg: &DatabaseConfig) -> ConnectOptions {
        let max_connections = self.pool_size(cfg);
        let mut options = ConnectOptions::new(cfg.url.clone());
        options
            .max_connections(max_connections)
            .min_connections(cfg.min_idle.min(max_connections))
            .connect_timeout(CONNECT_TIMEOUT)
            .acquire_timeout(cfg.timeout())
            .sqlx_logging(false);
        if self == Backend::Sqlite {
            options.map_sqlx_sqlite_opts(|opts| {
                opts.foreign_keys(true).busy_timeout(SQLITE_BUSY_TIMEOUT)
            });
        }
        options
    }

    pub async fn connect(self, cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
        Ok(Database::connect(self.options(cfg)).await?)
    }

    /// Creates an index the entity attributes cannot express, if it is missing.
    pub async fn ensure_index(
        self,
        db: &DatabaseConnection,
        index: &IndexCreateStatement,
    ) -> Result<()> {
        db.execute_unprepared(&self.index_sql(index)).await?;
        Ok(())
    }

    fn index_sql(self, index: &IndexCreateStatement) -> String {
        match self {
            Backend::Postgres => index.to_string(PostgresQueryBuilder),
            Backend::Sqlite => index.to_string(SqliteQueryBuilder),
        }
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Keeps credentials out of startup errors.
fn redact_url(url: &str) -> String {
    let trimmed = url.trim();
    if let Some((scheme, _)) = trimmed.split_once("://") {
        format!("{scheme}://<redacted>")
    } else if let Some((scheme, _)) = trimmed.split_once(':') {
        format!("{scheme}:<redacted>")
    } else {
        "<invalid-url>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::sqlx;
    use uuid::Uuid;

    use super::{Backend, redact_url};
    use crate::{config::DatabaseConfig, db::entities::active_session};

    #[test]
    fn url_scheme_selects_backend() {
        assert_eq!(
            Backend::from_url("postgres://auth@localhost/auth").expect("postgres"),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("PostgreSQL://auth@localhost/auth").expect("postgresql"),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("sqlite::memory:").expect("sqlite"),
            Backend::Sqlite
        );
    }

    #[test]
    fn unsupported_url_error_hides_credentials() {
        let message = Backend::from_url("mysql://root:hunter2@db/auth")
            .expect_err("mysql should not resolve")
            .to_string();

        assert!(message.contains("unsupported database url"));
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn in_memory_sqlite_gets_a_single_connection() {
        let memory = DatabaseConfig::new("sqlite::memory:");
        let shared = DatabaseConfig::new("sqlite://file:auth?mode=memory&cache=shared");
        let on_disk = DatabaseConfig::new("sqlite://./auth.db?mode=rwc");

        assert_eq!(Backend::Sqlite.pool_size(&memory), 1);
        assert_eq!(Backend::Sqlite.pool_size(&shared), 1);
        assert_eq!(Backend::Sqlite.pool_size(&on_disk), on_disk.max_connections);
        assert_eq!(
            Backend::Postgres.pool_size(&DatabaseConfig::new("postgres://db/auth")),
            DatabaseConfig::new("postgres://db/auth").max_connections
        );
    }

    #[test]
    fn session_index_covers_user_and_device() {
        let index = active_session::device_index();

        for backend in [Backend::Postgres, Backend::Sqlite] {
            let sql = backend.index_sql(&index);
            assert!(sql.starts_with("CREATE INDEX IF NOT EXISTS"), "{sql}");
            assert!(sql.contains(r#""active_sessions""#), "{sql}");
            assert!(sql.contains(r#"("user_id", "device_info")"#), "{sql}");
        }
    }

    #[tokio::test]
    async fn every_pooled_sqlite_connection_enforces_foreign_keys() {
        let file = format!("auth-service-{}.db", Uuid::new_v4());
        let path = std::env::temp_dir().join(file);
        let mut cfg = DatabaseConfig::new(format!("sqlite://{}?mode=rwc", path.display()));
        cfg.max_connections = 3;
        cfg.min_idle = 0;

        let db = Backend::Sqlite
            .connect(&cfg)
            .await
            .expect("sqlite should open");
        let pool = db.get_sqlite_connection_pool();
        let mut held = Vec::new();
        for _ in 0..3 {
            held.push(pool.acquire().await.expect("connection should open"));
        }
        for conn in &mut held {
            let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
                .fetch_one(&mut **conn)
                .await
                .expect("pragma should read");
            let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
                .fetch_one(&mut **conn)
                .await
                .expect("pragma should read");
            assert_eq!(foreign_keys, 1);
            assert_eq!(busy_timeout, 5_000);
        }

        drop(held);
        db.close().await.expect("pool should close");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn redact_handles_urls_without_authority() {
        assert_eq!(redact_url("sqlite::memory:"), "sqlite:<redacted>");
        assert_eq!(redact_url("nonsense"), "<invalid-url>");
    }
}
