use std::sync::Arc;

use axum::{Router, extract::State, routing::get};

use crate::{
    error::AppError,
    response::{ApiResult, JsonApiResponse},
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    state.db.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "health check could not reach the database");
        AppError::unavailable("database unreachable")
    })?;
    JsonApiResponse::ok(serde_json::json!({
        "ok": true,
        "identity_providers": state.identity_providers.configured(),
    }))
}
