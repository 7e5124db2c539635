use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::token_cookies;
use crate::{
    auth::providers::{ProviderId, normalize},
    error::AppError,
    middleware::cookies::{OAUTH_STATE_COOKIE, clear_cookie, device_info, read_cookie, set_cookie},
    response::JsonApiResponse,
    services::AuthOutcome,
    state::AppState,
};

const STATE_COOKIE_MAX_AGE_SECS: i64 = 10 * 60;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/oauth/{provider}/login", get(start))
        .route("/oauth/{provider}/callback", get(callback))
        .with_state(state)
}

fn provider_id(raw: &str) -> Result<ProviderId, AppError> {
    raw.parse::<ProviderId>().map_err(AppError::not_found)
}

async fn start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<(StatusCode, HeaderMap), AppError> {
    let provider = state.identity_providers.get(provider_id(&provider)?)?;
    let nonce = Uuid::new_v4().simple().to_string();
    let url = provider.authorize_url(&nonce)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        LOCATION,
        HeaderValue::from_str(&url).map_err(|_| AppError::internal("Invalid authorize url"))?,
    );
    headers.insert(
        SET_COOKIE,
        set_cookie(
            OAUTH_STATE_COOKIE,
            &nonce,
            STATE_COOKIE_MAX_AGE_SECS,
            state.secure_cookies(),
        )?,
    );
    Ok((StatusCode::FOUND, headers))
}

async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<(HeaderMap, JsonApiResponse<AuthOutcome>), AppError> {
    let provider_id = provider_id(&provider)?;
    if read_cookie(&headers, OAUTH_STATE_COOKIE).as_deref() != Some(query.state.as_str()) {
        return Err(AppError::unauthorized("OAuth state mismatch"));
    }

    let provider = state.identity_providers.get(provider_id)?;
    let payload = provider.fetch_identity(&query.code).await?;
    let identity = normalize(payload)?;

    let outcome = state
        .sessions
        .login_federated(identity, &device_info(&headers))
        .await?;
    tracing::info!(provider = provider_id.as_str(), user_id = %outcome.user.id, "federated login");

    let mut cookies = token_cookies(&state, &outcome.tokens)?;
    cookies.append(
        SET_COOKIE,
        clear_cookie(OAUTH_STATE_COOKIE, state.secure_cookies())?,
    );
    Ok((cookies, JsonApiResponse::ok(outcome)?))
}
