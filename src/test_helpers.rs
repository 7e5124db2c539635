//! Wiring for integration tests: the full stack on in-memory SQLite.

use std::{sync::Arc, time::Duration};

use axum::{Router, middleware};
use sea_orm::{ColumnTrait, DatabaseBackend, EntityTrait, MockDatabase, QueryFilter};
use uuid::Uuid;

use crate::{
    auth::{
        bootstrap::{build_session_manager, seed},
        password::Argon2Hasher,
        providers::IdentityProviders,
    },
    cache::InMemoryRevocationCache,
    config::{AppConfig, AuthConfig, DatabaseConfig},
    db::{
        connection,
        entities::{active_session, prelude::ActiveSession},
    },
    middleware::json_error_middleware,
    routes::router,
    services::{ServiceContext, SessionManager},
    state::AppState,
};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const SUPERUSER_LOGIN: &str = "root";
pub const SUPERUSER_PASSWORD: &str = "root-password";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub cache: InMemoryRevocationCache,
    pub router: Router,
}

impl TestApp {
    pub fn sessions(&self) -> &SessionManager {
        &self.state.sessions
    }

    /// Every device session the user currently holds.
    pub async fn active_sessions(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<active_session::Model>> {
        Ok(ActiveSession::find()
            .filter(active_session::Column::UserId.eq(user_id))
            .all(&self.state.db)
            .await?)
    }

    /// Subject and remaining lifetime of a blacklisted token id.
    pub async fn blacklist_entry(&self, token_id: &str) -> Option<(String, Duration)> {
        self.cache.live_entry(token_id).await
    }
}

pub fn test_config(database_url: &str) -> AppConfig {
    let mut auth = AuthConfig::new(TEST_SECRET);
    auth.superuser_login = Some(SUPERUSER_LOGIN.to_string());
    auth.superuser_password = Some(SUPERUSER_PASSWORD.to_string());

    AppConfig {
        database: Some(DatabaseConfig::new(database_url)),
        auth: Some(auth),
        ..AppConfig::default()
    }
}

/// Cheap Argon2 parameters; production uses the crate defaults.
fn test_hasher() -> anyhow::Result<Argon2Hasher> {
    Ok(Argon2Hasher::with_params(8, 1, 1)?)
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(router(state))
        .layer(middleware::from_fn(json_error_middleware))
}

pub async fn spawn_app(identity_providers: IdentityProviders) -> anyhow::Result<TestApp> {
    let cfg = test_config("sqlite::memory:");
    let db_cfg = cfg
        .database
        .clone()
        .ok_or_else(|| anyhow::anyhow!("database config missing"))?;
    let auth = cfg
        .auth
        .clone()
        .ok_or_else(|| anyhow::anyhow!("auth config missing"))?;

    let db = connection::connect(&db_cfg).await?;
    let cache = InMemoryRevocationCache::new();
    let sessions = build_session_manager(
        &auth,
        ServiceContext::new(&db, db_cfg.timeout()),
        Arc::new(cache.clone()),
        Arc::new(test_hasher()?),
        cfg.cache.timeout(),
    )?;
    seed(&sessions, &auth).await?;

    let state = AppState::new(cfg, db, sessions, identity_providers);
    Ok(TestApp {
        router: app_router(state.clone()),
        state,
        cache,
    })
}

/// Router over a mock database that has no queued results; good for requests that
/// must be rejected before any query runs.
pub fn mock_router() -> anyhow::Result<Router> {
    let cfg = test_config("postgres://unused");
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let auth = cfg
        .auth
        .clone()
        .ok_or_else(|| anyhow::anyhow!("auth config missing"))?;
    let sessions = build_session_manager(
        &auth,
        ServiceContext::new(&db, Duration::from_secs(1)),
        Arc::new(InMemoryRevocationCache::new()),
        Arc::new(test_hasher()?),
        cfg.cache.timeout(),
    )?;
    let state = AppState::new(cfg, db, sessions, IdentityProviders::new());
    Ok(app_router(state))
}
