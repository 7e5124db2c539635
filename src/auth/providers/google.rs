use async_trait::async_trait;
use reqwest::Client;

use super::{
    IdentityProvider, ProviderId,
    normalize::{GoogleUserInfo, ProviderPayload},
    oauth::OAuthClient,
};
use crate::{config::OAuthClientConfig, error::AppError};

#[derive(Clone)]
pub struct GoogleProvider {
    client: OAuthClient,
}

impl GoogleProvider {
    pub fn new(cfg: OAuthClientConfig, http: Client) -> Self {
        Self {
            client: OAuthClient::new(ProviderId::Google, cfg, http),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        self.client.authorize_url(state)
    }

    async fn fetch_identity(&self, code: &str) -> Result<ProviderPayload, AppError> {
        let access_token = self.client.exchange_code(code).await?;
        let info: GoogleUserInfo = self.client.fetch_userinfo(&access_token, "Bearer").await?;
        Ok(ProviderPayload::Google(info))
    }
}
