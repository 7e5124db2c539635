use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{active_session, prelude::ActiveSession};

#[derive(Clone)]
pub struct SessionDao {
    db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub device_info: String,
    pub refresh_token_id: Uuid,
    pub issued_at: chrono::DateTime<chrono::FixedOffset>,
    pub expires_at: chrono::DateTime<chrono::FixedOffset>,
}

impl NewSession {
    fn into_active_model(self) -> active_session::ActiveModel {
        active_session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(self.user_id),
            refresh_token_id: Set(self.refresh_token_id),
            issued_at: Set(self.issued_at),
            expires_at: Set(self.expires_at),
            device_info: Set(self.device_info),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
    }
}

impl DaoBase for SessionDao {
    type Entity = ActiveSession;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl SessionDao {
    /// Drops whatever session the device had and stores `session`, in one transaction.
    pub async fn replace(&self, session: NewSession) -> DaoResult<()> {
        let txn = self.db.begin().await.map_err(DaoLayerError::Db)?;

        ActiveSession::delete_many()
            .filter(active_session::Column::UserId.eq(session.user_id))
            .filter(active_session::Column::DeviceInfo.eq(session.device_info.as_str()))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::Db)?;
        Self::insert_in(&txn, session).await?;

        txn.commit().await.map_err(DaoLayerError::Db)
    }

    /// Compare-and-swap: replaces the device's session only while it still carries
    /// `expected_refresh_id`. Returns false, with nothing written, when it does not.
    pub async fn rotate(&self, expected_refresh_id: Uuid, session: NewSession) -> DaoResult<bool> {
        let txn = self.db.begin().await.map_err(DaoLayerError::Db)?;

        let removed = ActiveSession::delete_many()
            .filter(active_session::Column::UserId.eq(session.user_id))
            .filter(active_session::Column::DeviceInfo.eq(session.device_info.as_str()))
            .filter(active_session::Column::RefreshTokenId.eq(expected_refresh_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::Db)?
            .rows_affected;

        if removed == 0 {
            txn.rollback().await.map_err(DaoLayerError::Db)?;
            return Ok(false);
        }

        Self::insert_in(&txn, session).await?;
        txn.commit().await.map_err(DaoLayerError::Db)?;
        Ok(true)
    }

    pub async fn exists(
        &self,
        user_id: Uuid,
        device_info: &str,
        refresh_token_id: Uuid,
    ) -> DaoResult<bool> {
        ActiveSession::find()
            .filter(active_session::Column::UserId.eq(user_id))
            .filter(active_session::Column::DeviceInfo.eq(device_info))
            .filter(active_session::Column::RefreshTokenId.eq(refresh_token_id))
            .one(&self.db)
            .await
            .map(|row| row.is_some())
            .map_err(DaoLayerError::Db)
    }

    pub async fn delete_for_device(&self, user_id: Uuid, device_info: &str) -> DaoResult<u64> {
        ActiveSession::delete_many()
            .filter(active_session::Column::UserId.eq(user_id))
            .filter(active_session::Column::DeviceInfo.eq(device_info))
            .exec(&self.db)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::Db)
    }

    async fn insert_in<C: ConnectionTrait>(conn: &C, session: NewSession) -> DaoResult<()> {
        ActiveSession::insert(session.into_active_model())
            .exec_without_returning(conn)
            .await
            .map(|_| ())
            .map_err(DaoLayerError::Db)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{NewSession, SessionDao};
    use crate::db::{
        dao::{DaoBase, DaoLayerError},
        entities::active_session,
    };

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn new_session(user_id: Uuid) -> NewSession {
        NewSession {
            user_id,
            device_info: "firefox".to_string(),
            refresh_token_id: Uuid::new_v4(),
            issued_at: ts(),
            expires_at: ts() + Duration::hours(25),
        }
    }

    #[tokio::test]
    async fn replace_deletes_then_inserts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let dao = SessionDao::new(&db);

        dao.replace(new_session(Uuid::new_v4()))
            .await
            .expect("replace should succeed");
    }

    #[tokio::test]
    async fn rotate_with_stale_refresh_id_writes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let dao = SessionDao::new(&db);

        let rotated = dao
            .rotate(Uuid::new_v4(), new_session(Uuid::new_v4()))
            .await
            .expect("rotate should not error");

        assert!(!rotated);
    }

    #[tokio::test]
    async fn rotate_with_current_refresh_id_swaps_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let dao = SessionDao::new(&db);

        let rotated = dao
            .rotate(Uuid::new_v4(), new_session(Uuid::new_v4()))
            .await
            .expect("rotate should succeed");

        assert!(rotated);
    }

    #[tokio::test]
    async fn exists_reflects_matching_row() {
        let user_id = Uuid::new_v4();
        let row = active_session::Model {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_id: Uuid::new_v4(),
            issued_at: ts(),
            expires_at: ts(),
            device_info: "firefox".to_string(),
            created_at: ts(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row.clone()], Vec::new()])
            .into_connection();
        let dao = SessionDao::new(&db);

        assert!(dao
            .exists(user_id, "firefox", row.refresh_token_id)
            .await
            .expect("query should succeed"));
        assert!(!dao
            .exists(user_id, "firefox", Uuid::new_v4())
            .await
            .expect("query should succeed"));
    }

    #[tokio::test]
    async fn delete_for_device_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("delete failed".to_string())])
            .into_connection();
        let dao = SessionDao::new(&db);

        let err = dao
            .delete_for_device(Uuid::new_v4(), "firefox")
            .await
            .expect_err("delete should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
