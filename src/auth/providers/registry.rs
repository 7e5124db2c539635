use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::normalize::ProviderPayload;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yandex,
    Google,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Yandex => "yandex",
            ProviderId::Google => "google",
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "yandex" => Ok(ProviderId::Yandex),
            "google" => Ok(ProviderId::Google),
            other => Err(format!("unsupported identity provider: {}", other)),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Where to send the browser to start the authorization-code flow.
    fn authorize_url(&self, state: &str) -> Result<String, AppError>;

    /// Trades an authorization code for the provider's user-info payload.
    async fn fetch_identity(&self, code: &str) -> Result<ProviderPayload, AppError>;
}

#[derive(Clone, Default)]
pub struct IdentityProviders {
    providers: HashMap<ProviderId, Arc<dyn IdentityProvider>>,
}

impl IdentityProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Result<Self, AppError> {
        self.add(provider)?;
        Ok(self)
    }

    pub fn add(&mut self, provider: Arc<dyn IdentityProvider>) -> Result<(), AppError> {
        let id = provider.id();
        if self.providers.contains_key(&id) {
            return Err(AppError::conflict(format!(
                "Identity provider already registered: {}",
                id.as_str()
            )));
        }
        self.providers.insert(id, provider);
        Ok(())
    }

    pub fn get(&self, id: ProviderId) -> Result<&dyn IdentityProvider, AppError> {
        self.providers
            .get(&id)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Identity provider not configured: {}",
                    id.as_str()
                ))
            })
    }

    pub fn configured(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self.providers.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}
