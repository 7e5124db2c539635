use reqwest::{Client, Url};
use serde::{Deserialize, de::DeserializeOwned};

use super::ProviderId;
use crate::{config::OAuthClientConfig, error::AppError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authorization-code plumbing shared by every provider.
#[derive(Clone)]
pub struct OAuthClient {
    provider: ProviderId,
    cfg: OAuthClientConfig,
    http: Client,
}

impl OAuthClient {
    pub fn new(provider: ProviderId, cfg: OAuthClientConfig, http: Client) -> Self {
        Self {
            provider,
            cfg,
            http,
        }
    }

    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.cfg.client_id.as_str()),
            ("redirect_uri", self.cfg.redirect_uri.as_str()),
            ("state", state),
        ];
        if let Some(scope) = self.cfg.scope.as_deref() {
            params.push(("scope", scope));
        }

        Url::parse_with_params(&self.cfg.authorize_url, &params)
            .map(String::from)
            .map_err(|err| {
                tracing::error!(provider = self.provider.as_str(), error = %err, "bad authorize url");
                AppError::internal("Identity provider is misconfigured")
            })
    }

    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
            ("redirect_uri", self.cfg.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&self.cfg.token_url)
            .form(&form)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| self.unavailable("token exchange", err))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| self.unavailable("token exchange", err))?;
        Ok(token.access_token)
    }

    /// `scheme` is the Authorization prefix the provider expects ("Bearer", "OAuth").
    pub async fn fetch_userinfo<T: DeserializeOwned>(
        &self,
        access_token: &str,
        scheme: &str,
    ) -> Result<T, AppError> {
        self.http
            .get(&self.cfg.userinfo_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{scheme} {access_token}"),
            )
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| self.unavailable("user info", err))?
            .json::<T>()
            .await
            .map_err(|err| self.unavailable("user info", err))
    }

    fn unavailable(&self, step: &str, err: reqwest::Error) -> AppError {
        tracing::warn!(
            provider = self.provider.as_str(),
            step,
            timeout = err.is_timeout(),
            error = %err,
            "identity provider request failed"
        );
        AppError::unavailable("identity provider unavailable")
    }
}
