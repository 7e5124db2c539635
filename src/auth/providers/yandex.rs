use async_trait::async_trait;
use reqwest::Client;

use super::{
    IdentityProvider, ProviderId,
    normalize::{ProviderPayload, YandexUserInfo},
    oauth::OAuthClient,
};
use crate::{config::OAuthClientConfig, error::AppError};

#[derive(Clone)]
pub struct YandexProvider {
    client: OAuthClient,
}

impl YandexProvider {
    pub fn new(cfg: OAuthClientConfig, http: Client) -> Self {
        Self {
            client: OAuthClient::new(ProviderId::Yandex, cfg, http),
        }
    }
}

#[async_trait]
impl IdentityProvider for YandexProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Yandex
    }

    fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        self.client.authorize_url(state)
    }

    async fn fetch_identity(&self, code: &str) -> Result<ProviderPayload, AppError> {
        let access_token = self.client.exchange_code(code).await?;
        // Yandex ID expects its own "OAuth" scheme rather than Bearer.
        let info: YandexUserInfo = self.client.fetch_userinfo(&access_token, "OAuth").await?;
        Ok(ProviderPayload::Yandex(info))
    }
}
