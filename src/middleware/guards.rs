use std::{marker::PhantomData, sync::Arc};

use axum::extract::FromRequestParts;

use super::cookies::access_token;
use crate::{
    auth::{Claims, RequiredRole, Role},
    error::AppError,
    state::AppState,
};

// Auth guard: authenticate the access token (signature, expiry, blacklist).
impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>().cloned() {
            return Ok(claims);
        }

        let token = access_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Missing access token"))?;
        let claims = state.sessions.authenticate(&token).await?;

        parts.extensions.insert(claims.clone());
        Ok(claims)
    }
}

pub type AuthGuard = Claims;

pub struct AuthRoleGuard<R: RequiredRole> {
    pub claims: Claims,
    _marker: PhantomData<R>,
}

impl<R> FromRequestParts<Arc<AppState>> for AuthRoleGuard<R>
where
    R: RequiredRole,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;

        if !Role::at_least(&claims.role, R::required().as_str()) {
            return Err(AppError::forbidden("Insufficient role"));
        }

        Ok(Self {
            claims,
            _marker: PhantomData,
        })
    }
}
