use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod oauth;
pub mod profile;
pub mod public;
pub mod roles;

pub const API_PREFIX: &str = "/api/v1";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().nest(API_PREFIX, api_router(state))
}

fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::router(state.clone()))
        .merge(auth::router(state.clone()))
        .merge(oauth::router(state.clone()))
        .merge(profile::router(state.clone()))
        .merge(roles::router(state))
}
