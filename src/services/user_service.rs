use std::time::Duration;

use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    auth::{Role, providers::CanonicalIdentity},
    db::dao::{
        DaoBase, DaoContext, DaoLayerError, NewUser, RoleDao, UserDao, UserRoleDao, with_deadline,
    },
    db::entities::user,
    error::AppError,
};

#[derive(Clone)]
pub struct UserService {
    daos: DaoContext,
    deadline: Duration,
}

/// Result of resolving a federated identity against local accounts.
#[derive(Debug, Clone)]
pub struct ResolvedUser {
    pub user: user::Model,
    pub provisioned: bool,
}

impl UserService {
    pub fn new(daos: DaoContext, deadline: Duration) -> Self {
        Self { daos, deadline }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, AppError> {
        match with_deadline(self.deadline, self.daos.user().find_by_id(id)).await {
            Ok(model) => Ok(Some(model)),
            Err(DaoLayerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<user::Model>, AppError> {
        Ok(with_deadline(self.deadline, self.daos.user().find_by_login(login)).await?)
    }

    /// Creates the account and its baseline role link in one transaction.
    pub async fn signup(&self, new_user: NewUser) -> Result<user::Model, AppError> {
        let db = self.daos.db().clone();
        let login = new_user.login.clone();

        let created = with_deadline(self.deadline, async move {
            let txn = db.begin().await.map_err(DaoLayerError::Db)?;
            if !UserDao::insert_if_absent_in(&txn, new_user).await? {
                return Ok(None);
            }
            let user = UserDao::find_by_login_in(&txn, &login).await?;
            if let Some(user) = &user {
                link_baseline_role(&txn, user.id).await?;
            }
            txn.commit().await.map_err(DaoLayerError::Db)?;
            Ok(user)
        })
        .await?;

        created.ok_or_else(|| AppError::conflict("Record already exists"))
    }

    pub async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        Ok(with_deadline(
            self.deadline,
            self.daos.user().set_password_hash(id, password_hash),
        )
        .await?)
    }

    /// Insert-if-absent on login. A new account gets `password_hash` and the baseline
    /// role; an existing one only has its names refreshed.
    pub async fn resolve_or_provision(
        &self,
        identity: CanonicalIdentity,
        password_hash: String,
    ) -> Result<ResolvedUser, AppError> {
        let db = self.daos.db().clone();

        let resolved = with_deadline(self.deadline, async move {
            let txn = db.begin().await.map_err(DaoLayerError::Db)?;
            let provisioned = UserDao::insert_if_absent_in(
                &txn,
                NewUser {
                    id: Uuid::new_v4(),
                    login: identity.login.clone(),
                    password_hash,
                    first_name: identity.first_name.clone(),
                    last_name: identity.last_name.clone(),
                },
            )
            .await?;

            if !provisioned {
                UserDao::update_names_in(
                    &txn,
                    &identity.login,
                    identity.first_name.clone(),
                    identity.last_name.clone(),
                )
                .await?;
            }

            let user = UserDao::find_by_login_in(&txn, &identity.login).await?;
            if let (true, Some(user)) = (provisioned, &user) {
                link_baseline_role(&txn, user.id).await?;
            }
            txn.commit().await.map_err(DaoLayerError::Db)?;
            Ok(user.map(|user| ResolvedUser { user, provisioned }))
        })
        .await?;

        resolved.ok_or_else(|| AppError::internal("Federated user vanished during provisioning"))
    }
}

async fn link_baseline_role<C: sea_orm::ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<(), DaoLayerError> {
    let baseline = Role::BASELINE;
    let role = RoleDao::ensure_in(
        conn,
        baseline.as_str(),
        Some(baseline.description().to_string()),
    )
    .await?;
    UserRoleDao::link_in(conn, user_id, role.id).await?;
    Ok(())
}
