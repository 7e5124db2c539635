use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
    sea_query::{OnConflict, Query},
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{prelude::Role, role, user_role};

#[derive(Clone)]
pub struct RoleDao {
    db: DatabaseConnection,
}

impl DaoBase for RoleDao {
    type Entity = Role;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn active_role(name: &str, description: Option<String>) -> role::ActiveModel {
    role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}

impl RoleDao {
    pub async fn create(&self, name: &str, description: Option<String>) -> DaoResult<role::Model> {
        active_role(name, description)
            .insert(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }

    pub async fn find_by_name_in<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> DaoResult<Option<role::Model>> {
        Role::find()
            .filter(role::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(DaoLayerError::Db)
    }

    /// Inserts the role when missing and returns the stored row either way.
    pub async fn ensure_in<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        description: Option<String>,
    ) -> DaoResult<role::Model> {
        Role::insert(active_role(name, description))
            .on_conflict(
                OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(DaoLayerError::Db)?;

        Self::find_by_name_in(conn, name).await?.ok_or_else(|| {
            DaoLayerError::Db(DbErr::RecordNotFound(format!("role {name} after upsert")))
        })
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> DaoResult<role::Model> {
        let model = self.find_by_id(id).await?;
        let mut active = model.into_active_model();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = description {
            active.description = Set(Some(description));
        }
        active.update(&self.db).await.map_err(DaoLayerError::Db)
    }

    pub async fn delete(&self, id: Uuid) -> DaoResult<Uuid> {
        let result = Role::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;

        if result.rows_affected == 0 {
            return Err(DaoLayerError::NotFound {
                entity: "roles",
                id,
            });
        }
        Ok(id)
    }

    /// `name_filter` is a SQL LIKE pattern.
    pub async fn list(&self, name_filter: Option<&str>) -> DaoResult<Vec<role::Model>> {
        let mut query = Role::find().order_by_asc(role::Column::Name);
        if let Some(pattern) = name_filter {
            query = query.filter(role::Column::Name.like(pattern));
        }
        query.all(&self.db).await.map_err(DaoLayerError::Db)
    }

    pub async fn roles_of_in<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> DaoResult<Vec<role::Model>> {
        Role::find()
            .filter(
                role::Column::Id.in_subquery(
                    Query::select()
                        .column(user_role::Column::RoleId)
                        .from(user_role::Entity)
                        .and_where(user_role::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .all(conn)
            .await
            .map_err(DaoLayerError::Db)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::RoleDao;
    use crate::db::{
        dao::{DaoBase, DaoLayerError},
        entities::role,
    };

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn role_model(name: &str) -> role::Model {
        role::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            created_at: ts(),
        }
    }

    #[tokio::test]
    async fn ensure_returns_existing_row_after_conflict() {
        let existing = role_model("user");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[existing.clone()]])
            .into_connection();

        let role = RoleDao::ensure_in(&db, "user", None)
            .await
            .expect("ensure should succeed");

        assert_eq!(role, existing);
    }

    #[tokio::test]
    async fn delete_missing_role_is_not_found() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let dao = RoleDao::new(&db);

        let err = dao.delete(id).await.expect_err("delete should fail");

        assert!(matches!(err, DaoLayerError::NotFound { id: missing, .. } if missing == id));
    }

    #[tokio::test]
    async fn roles_of_returns_linked_roles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[role_model("user"), role_model("admin")]])
            .into_connection();

        let roles = RoleDao::roles_of_in(&db, Uuid::new_v4())
            .await
            .expect("query should succeed");

        let names: Vec<&str> = roles.iter().map(|role| role.name.as_str()).collect();
        assert_eq!(names, vec!["user", "admin"]);
    }
}
