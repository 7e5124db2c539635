use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{
    db::dao::PaginatedResponse,
    middleware::AuthGuard,
    response::{ApiResult, JsonApiResponse},
    services::{UserProfile, session_store::HistoryEntry},
    state::AppState,
};

const DEFAULT_HISTORY_PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_page_number")]
    pub page_number: u64,
}

fn default_page_size() -> u64 {
    DEFAULT_HISTORY_PAGE_SIZE
}

fn default_page_number() -> u64 {
    1
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/profile", get(profile))
        .route("/profile/history", get(history))
        .with_state(state)
}

async fn profile(State(state): State<Arc<AppState>>, claims: AuthGuard) -> ApiResult<UserProfile> {
    JsonApiResponse::ok(state.sessions.profile(claims.user_id).await?)
}

async fn history(
    State(state): State<Arc<AppState>>,
    claims: AuthGuard,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<PaginatedResponse<HistoryEntry>> {
    let page = state
        .sessions
        .history(claims.user_id, query.page_size, query.page_number)
        .await?;
    JsonApiResponse::ok(page)
}
