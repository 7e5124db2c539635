use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{TokenKind, TokenPair},
    error::AppError,
    middleware::{
        AuthGuard,
        cookies::{
            ACCESS_COOKIE, REFRESH_COOKIE, access_token, clear_cookie, device_info, read_cookie,
            set_cookie,
        },
    },
    response::{ApiResult, JsonApiResponse},
    services::{AuthOutcome, UserProfile},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/password", post(change_password))
        .with_state(state)
}

/// `Set-Cookie` headers for a freshly issued pair.
pub(crate) fn token_cookies(state: &AppState, tokens: &TokenPair) -> Result<HeaderMap, AppError> {
    let codec = state.sessions.codec();
    let secure = state.secure_cookies();
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        set_cookie(
            ACCESS_COOKIE,
            &tokens.access_token,
            codec.access_ttl().num_seconds(),
            secure,
        )?,
    );
    headers.append(
        SET_COOKIE,
        set_cookie(
            REFRESH_COOKIE,
            &tokens.refresh_token,
            codec.refresh_ttl().num_seconds(),
            secure,
        )?,
    );
    Ok(headers)
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .sessions
        .signup(&body.login, &body.password, body.first_name, body.last_name)
        .await?;
    JsonApiResponse::with_status(StatusCode::CREATED, "created", profile)
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, JsonApiResponse<AuthOutcome>), AppError> {
    let device = device_info(&headers);
    let outcome = state
        .sessions
        .login(&body.login, &body.password, &device)
        .await?;
    let cookies = token_cookies(&state, &outcome.tokens)?;
    Ok((cookies, JsonApiResponse::ok(outcome)?))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, JsonApiResponse<TokenPair>), AppError> {
    let refresh_token = read_cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| AppError::unauthorized("Missing refresh token"))?;
    let claims = state
        .sessions
        .codec()
        .decode_as(&refresh_token, TokenKind::Refresh, Utc::now())?;
    let old_access = access_token(&headers);

    let tokens = state
        .sessions
        .refresh(
            claims.user_id,
            &device_info(&headers),
            old_access.as_deref(),
            &refresh_token,
        )
        .await?;
    let cookies = token_cookies(&state, &tokens)?;
    Ok((cookies, JsonApiResponse::ok(tokens)?))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    claims: AuthGuard,
    headers: HeaderMap,
) -> Result<(HeaderMap, JsonApiResponse<serde_json::Value>), AppError> {
    let access = access_token(&headers)
        .ok_or_else(|| AppError::unauthorized("Missing access token"))?;
    let refresh = read_cookie(&headers, REFRESH_COOKIE);

    state
        .sessions
        .logout(
            claims.user_id,
            &device_info(&headers),
            &access,
            refresh.as_deref(),
        )
        .await?;

    let secure = state.secure_cookies();
    let mut cookies = HeaderMap::new();
    cookies.append(SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)?);
    cookies.append(SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)?);
    Ok((cookies, JsonApiResponse::ok(serde_json::Value::Null)?))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    claims: AuthGuard,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<serde_json::Value> {
    state
        .sessions
        .change_password(claims.user_id, &body.new_password)
        .await?;
    JsonApiResponse::ok(serde_json::Value::Null)
}
