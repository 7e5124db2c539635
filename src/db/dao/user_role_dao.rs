use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};
use uuid::Uuid;

use super::{DaoLayerError, DaoResult};
use crate::db::entities::{prelude::UserRole, user_role};

/// Link table between users and roles. Keyed by the pair, so it sits outside `DaoBase`
/// and only ever runs inside a caller's connection or transaction.
pub struct UserRoleDao;

impl UserRoleDao {
    /// True when a new link was written, false when it already existed.
    pub async fn link_in<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        role_id: Uuid,
    ) -> DaoResult<bool> {
        let link = user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
            ..Default::default()
        };
        let rows = UserRole::insert(link)
            .on_conflict(
                OnConflict::columns([user_role::Column::UserId, user_role::Column::RoleId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(rows > 0)
    }

    pub async fn unlink_in<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        role_id: Uuid,
    ) -> DaoResult<u64> {
        UserRole::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::RoleId.eq(role_id))
            .exec(conn)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::Db)
    }
}
