use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;
use sea_orm::DatabaseConnection;

use super::{
    Role,
    jwt::TokenCodec,
    password::{Argon2Hasher, CredentialHasher},
    providers::{GoogleProvider, IdentityProviders, YandexProvider},
};
use crate::{
    cache::{self, RevocationCache},
    config::{AppConfig, AuthConfig, OAuthConfig},
    error::AppError,
    services::{ServiceContext, SessionManager},
};

/// Registers every provider that has client credentials configured.
pub fn build_identity_providers(cfg: &OAuthConfig) -> anyhow::Result<IdentityProviders> {
    let http = Client::builder()
        .timeout(cfg.http_timeout())
        .build()
        .context("failed to build OAuth http client")?;

    let mut providers = IdentityProviders::new();
    if let Some(yandex) = &cfg.yandex {
        providers.add(Arc::new(YandexProvider::new(yandex.clone(), http.clone())))?;
    }
    if let Some(google) = &cfg.google {
        providers.add(Arc::new(GoogleProvider::new(google.clone(), http)))?;
    }
    tracing::info!(providers = ?providers.configured(), "identity providers ready");
    Ok(providers)
}

pub fn build_session_manager(
    auth: &AuthConfig,
    services: ServiceContext,
    cache: Arc<dyn RevocationCache>,
    hasher: Arc<dyn CredentialHasher>,
    cache_timeout: std::time::Duration,
) -> Result<SessionManager, AppError> {
    let codec = TokenCodec::from_config(auth)?;
    Ok(SessionManager::new(services, codec, cache, hasher, cache_timeout))
}

/// Reserved roles, then the optional superuser account.
pub async fn seed(sessions: &SessionManager, auth: &AuthConfig) -> anyhow::Result<()> {
    let roles = sessions.services().role();
    roles
        .ensure_default_roles()
        .await
        .map_err(|err| anyhow::anyhow!("seeding roles failed: {err}"))?;

    let (Some(login), Some(password)) = (&auth.superuser_login, &auth.superuser_password) else {
        return Ok(());
    };

    let users = sessions.services().user();
    let existing = users
        .find_by_login(login)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    let user_id = match existing {
        Some(user) => {
            tracing::info!("superuser already present: {}", user.login);
            user.id
        }
        None => {
            let profile = sessions
                .signup(login, password, None, None)
                .await
                .map_err(|err| anyhow::anyhow!("superuser seed failed: {err}"))?;
            tracing::info!("seeded superuser {}", profile.login);
            profile.id
        }
    };

    let superuser = roles
        .list_roles(Some(Role::Superuser.as_str()))
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?
        .into_iter()
        .find(|role| role.name == Role::Superuser.as_str())
        .ok_or_else(|| anyhow::anyhow!("superuser role missing after seeding"))?;
    roles
        .assign(user_id, superuser.id)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    Ok(())
}

/// Everything the HTTP layer needs besides config and the pool.
pub async fn init_sessions(
    cfg: &AppConfig,
    db: &DatabaseConnection,
) -> anyhow::Result<(SessionManager, IdentityProviders)> {
    let auth = cfg
        .auth
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("auth config missing"))?;
    let db_timeout = cfg
        .database
        .as_ref()
        .map(|database| database.timeout())
        .ok_or_else(|| anyhow::anyhow!("database config missing"))?;

    let cache = cache::from_config(&cfg.cache).await?;
    let sessions = build_session_manager(
        auth,
        ServiceContext::new(db, db_timeout),
        cache,
        Arc::new(Argon2Hasher::default()),
        cfg.cache.timeout(),
    )?;
    seed(&sessions, auth).await?;

    let providers = build_identity_providers(&cfg.oauth)?;
    Ok((sessions, providers))
}
