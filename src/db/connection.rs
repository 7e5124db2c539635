use sea_orm::DatabaseConnection;
use tracing::info;

use super::{backend::Backend, entities::active_session};
use crate::config::DatabaseConfig;

/// Opens the pool for `cfg.url` and brings the schema in line with the entities.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let backend = Backend::from_url(&cfg.url)?;
    let db = backend.connect(cfg).await?;

    info!(backend = backend.as_str(), "syncing database schema from entities");
    db.get_schema_registry("auth_service::db::entities::*")
        .sync(&db)
        .await?;
    backend
        .ensure_index(&db, &active_session::device_index())
        .await?;
    Ok(db)
}
