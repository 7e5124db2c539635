use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AdminRole,
    db::entities::role,
    middleware::AuthRoleGuard,
    response::{ApiResult, JsonApiResponse},
    state::AppState,
};

type AdminGuard = AuthRoleGuard<AdminRole>;

#[derive(Debug, Serialize)]
pub struct RoleView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<role::Model> for RoleView {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleLinkRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/role", post(create_role))
        .route(
            "/role/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/role/assign", post(assign_role))
        .route("/role/revoke", post(revoke_role))
        .with_state(state)
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    _admin: AdminGuard,
    Query(filter): Query<RoleFilter>,
) -> ApiResult<Vec<RoleView>> {
    let roles = state
        .sessions
        .services()
        .role()
        .list_roles(filter.name.as_deref())
        .await?;
    JsonApiResponse::ok(roles.into_iter().map(RoleView::from).collect())
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminGuard,
    Json(body): Json<CreateRoleRequest>,
) -> ApiResult<RoleView> {
    let role = state
        .sessions
        .services()
        .role()
        .create_role(&body.name, body.description)
        .await?;
    JsonApiResponse::with_status(StatusCode::CREATED, "created", role.into())
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminGuard,
    Path(id): Path<Uuid>,
) -> ApiResult<RoleView> {
    let role = state.sessions.services().role().get_role(id).await?;
    JsonApiResponse::ok(role.into())
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminGuard,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<RoleView> {
    let role = state
        .sessions
        .services()
        .role()
        .update_role(id, body.name, body.description)
        .await?;
    JsonApiResponse::ok(role.into())
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    _admin: AdminGuard,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    JsonApiResponse::ok(state.sessions.services().role().delete_role(id).await?)
}

async fn assign_role(
    State(state): State<Arc<AppState>>,
    AuthRoleGuard { claims, .. }: AdminGuard,
    Json(body): Json<RoleLinkRequest>,
) -> ApiResult<serde_json::Value> {
    let linked = state
        .sessions
        .services()
        .role()
        .assign(body.user_id, body.role_id)
        .await?;
    tracing::info!(admin = %claims.user_id, user_id = %body.user_id, role_id = %body.role_id, "role assigned");
    JsonApiResponse::ok(serde_json::json!({ "linked": linked }))
}

async fn revoke_role(
    State(state): State<Arc<AppState>>,
    AuthRoleGuard { claims, .. }: AdminGuard,
    Json(body): Json<RoleLinkRequest>,
) -> ApiResult<serde_json::Value> {
    state
        .sessions
        .services()
        .role()
        .revoke(body.user_id, body.role_id)
        .await?;
    tracing::info!(admin = %claims.user_id, user_id = %body.user_id, role_id = %body.role_id, "role revoked");
    JsonApiResponse::ok(serde_json::Value::Null)
}
