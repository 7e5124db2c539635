use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{auth::providers::IdentityProviders, config::AppConfig, services::SessionManager};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub sessions: SessionManager,
    pub identity_providers: IdentityProviders,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        sessions: SessionManager,
        identity_providers: IdentityProviders,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            db,
            sessions,
            identity_providers,
        })
    }

    /// Whether auth cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.config
            .auth
            .as_ref()
            .is_some_and(|auth| auth.cookie_secure)
    }
}
