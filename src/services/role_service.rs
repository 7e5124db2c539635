use std::time::Duration;

use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    auth::Role,
    db::dao::{DaoBase, DaoContext, DaoLayerError, RoleDao, UserRoleDao, with_deadline},
    db::entities::role,
    error::AppError,
};

/// Role catalog plus the user-role links that feed token claims.
#[derive(Clone)]
pub struct RoleService {
    daos: DaoContext,
    deadline: Duration,
}

impl RoleService {
    pub fn new(daos: DaoContext, deadline: Duration) -> Self {
        Self { daos, deadline }
    }

    pub async fn roles_of(&self, user_id: Uuid) -> Result<Vec<role::Model>, AppError> {
        Ok(with_deadline(self.deadline, RoleDao::roles_of_in(self.daos.db(), user_id)).await?)
    }

    /// Highest reserved role the user holds; custom roles never raise it.
    pub async fn primary_role(&self, user_id: Uuid) -> Result<Role, AppError> {
        let roles = self.roles_of(user_id).await?;
        Ok(Role::highest(roles.iter().map(|role| role.name.as_str())))
    }

    /// True when a new link was written.
    pub async fn assign(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, AppError> {
        let daos = self.daos.clone();
        Ok(with_deadline(self.deadline, async move {
            daos.user().find_by_id(user_id).await?;
            daos.role().find_by_id(role_id).await?;
            UserRoleDao::link_in(daos.db(), user_id, role_id).await
        })
        .await?)
    }

    /// Drops the link and makes sure the baseline link is still there, in one
    /// transaction.
    pub async fn revoke(&self, user_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        let target = with_deadline(self.deadline, self.daos.role().find_by_id(role_id)).await?;
        if target.name == Role::BASELINE.as_str() {
            return Err(AppError::validation("Baseline role cannot be revoked"));
        }

        let db = self.daos.db().clone();
        let removed = with_deadline(self.deadline, async move {
            let txn = db.begin().await.map_err(DaoLayerError::Db)?;
            let removed = UserRoleDao::unlink_in(&txn, user_id, role_id).await?;
            if removed == 0 {
                txn.rollback().await.map_err(DaoLayerError::Db)?;
                return Ok(0);
            }

            let baseline = Role::BASELINE;
            let baseline_role = RoleDao::ensure_in(
                &txn,
                baseline.as_str(),
                Some(baseline.description().to_string()),
            )
            .await?;
            UserRoleDao::link_in(&txn, user_id, baseline_role.id).await?;
            txn.commit().await.map_err(DaoLayerError::Db)?;
            Ok(removed)
        })
        .await?;

        if removed == 0 {
            return Err(AppError::not_found("Role is not assigned to this user"));
        }
        Ok(())
    }

    pub async fn create_role(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<role::Model, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Role name is empty"));
        }
        Ok(with_deadline(self.deadline, self.daos.role().create(name, description)).await?)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<role::Model, AppError> {
        Ok(with_deadline(self.deadline, self.daos.role().find_by_id(id)).await?)
    }

    pub async fn update_role(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<role::Model, AppError> {
        let name = name.map(|name| name.trim().to_string());
        if name.is_none() && description.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }
        if name.as_deref().is_some_and(str::is_empty) {
            return Err(AppError::validation("Role name is empty"));
        }

        let current = self.get_role(id).await?;
        let renames = name.as_deref().is_some_and(|name| name != current.name);
        if renames && Role::is_reserved(&current.name) {
            return Err(AppError::validation("Reserved roles cannot be renamed"));
        }

        Ok(with_deadline(
            self.deadline,
            self.daos.role().update(id, name, description),
        )
        .await?)
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<Uuid, AppError> {
        let current = self.get_role(id).await?;
        if Role::is_reserved(&current.name) {
            return Err(AppError::validation("Reserved roles cannot be deleted"));
        }
        Ok(with_deadline(self.deadline, self.daos.role().delete(id)).await?)
    }

    /// Substring match on the role name.
    pub async fn list_roles(
        &self,
        name_filter: Option<&str>,
    ) -> Result<Vec<role::Model>, AppError> {
        let pattern = name_filter
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .map(|filter| format!("%{filter}%"));
        Ok(with_deadline(self.deadline, self.daos.role().list(pattern.as_deref())).await?)
    }

    pub async fn ensure_default_roles(&self) -> Result<Vec<role::Model>, AppError> {
        let mut seeded = Vec::with_capacity(Role::ALL.len());
        for reserved in Role::ALL {
            let role = with_deadline(
                self.deadline,
                RoleDao::ensure_in(
                    self.daos.db(),
                    reserved.as_str(),
                    Some(reserved.description().to_string()),
                ),
            )
            .await?;
            seeded.push(role);
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::RoleService;
    use crate::{
        auth::Role,
        db::{dao::DaoContext, entities::role},
        error::AppError,
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

    fn service(db: MockDatabase) -> RoleService {
        RoleService::new(
            DaoContext::new(&db.into_connection()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn primary_role_ignores_custom_roles() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
                role_model("user"),
                role_model("beta-tester"),
                role_model("admin"),
            ]]),
        );

        let primary = service
            .primary_role(Uuid::new_v4())
            .await
            .expect("lookup should succeed");

        assert_eq!(primary, Role::Admin);
    }

    #[tokio::test]
    async fn user_without_links_falls_back_to_baseline() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<role::Model>::new()]),
        );

        let primary = service
            .primary_role(Uuid::new_v4())
            .await
            .expect("lookup should succeed");

        assert_eq!(primary, Role::User);
    }

    #[tokio::test]
    async fn baseline_role_cannot_be_revoked() {
        let baseline = role_model("user");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![baseline.clone()]]),
        );

        let err = service
            .revoke(Uuid::new_v4(), baseline.id)
            .await
            .expect_err("revoke should fail");

        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn reserved_roles_cannot_be_deleted() {
        let admin = role_model("admin");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![admin.clone()]]),
        );

        let err = service
            .delete_role(admin.id)
            .await
            .expect_err("delete should fail");

        assert_eq!(err, AppError::validation("Reserved roles cannot be deleted"));
    }

    #[tokio::test]
    async fn update_without_fields_is_rejected_before_any_query() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service
            .update_role(Uuid::new_v4(), None, None)
            .await
            .expect_err("update should fail");

        assert_eq!(err, AppError::validation("Nothing to update"));
    }

    #[tokio::test]
    async fn revoke_of_unassigned_role_is_not_found() {
        let custom = role_model("beta-tester");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![custom.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }]),
        );

        let err = service
            .revoke(Uuid::new_v4(), custom.id)
            .await
            .expect_err("revoke should fail");

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
