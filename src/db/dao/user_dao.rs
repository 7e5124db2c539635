use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{prelude::User, user};

#[derive(Clone)]
pub struct UserDao {
    db: DatabaseConnection,
}

/// Column values for a user row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub login: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewUser {
    fn into_active_model(self) -> user::ActiveModel {
        let now = Utc::now().fixed_offset();
        user::ActiveModel {
            id: Set(self.id),
            login: Set(self.login),
            password_hash: Set(self.password_hash),
            first_name: Set(self.first_name),
            last_name: Set(self.last_name),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}

impl DaoBase for UserDao {
    type Entity = User;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl UserDao {
    pub async fn find_by_login(&self, login: &str) -> DaoResult<Option<user::Model>> {
        let login = login.to_string();
        self.find(1, 1, None, move |query| {
            query.filter(user::Column::Login.eq(login))
        })
        .await
        .map(|response| response.data.into_iter().next())
    }

    pub async fn find_by_login_in<C: ConnectionTrait>(
        conn: &C,
        login: &str,
    ) -> DaoResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Login.eq(login))
            .one(conn)
            .await
            .map_err(DaoLayerError::Db)
    }

    /// `INSERT .. ON CONFLICT (login) DO NOTHING`; true when the row was written.
    pub async fn insert_if_absent_in<C: ConnectionTrait>(
        conn: &C,
        new_user: NewUser,
    ) -> DaoResult<bool> {
        let rows = User::insert(new_user.into_active_model())
            .on_conflict(
                OnConflict::column(user::Column::Login)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(DaoLayerError::Db)?;
        Ok(rows > 0)
    }

    /// Names the provider left out keep their stored value.
    pub async fn update_names_in<C: ConnectionTrait>(
        conn: &C,
        login: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> DaoResult<u64> {
        let mut update = User::update_many().col_expr(
            user::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        );
        if let Some(first_name) = first_name {
            update = update.col_expr(user::Column::FirstName, Expr::value(first_name));
        }
        if let Some(last_name) = last_name {
            update = update.col_expr(user::Column::LastName, Expr::value(last_name));
        }

        update
            .filter(user::Column::Login.eq(login))
            .exec(conn)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::Db)
    }

    pub async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DaoResult<()> {
        let result = User::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(
                user::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;

        if result.rows_affected == 0 {
            return Err(DaoLayerError::NotFound {
                entity: "users",
                id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{NewUser, UserDao};
    use crate::db::{
        dao::{DaoBase, DaoLayerError},
        entities::user,
    };

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn user_model(id: Uuid, login: &str) -> user::Model {
        user::Model {
            id,
            login: login.to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn new_user(login: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            password_hash: "hash".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn find_by_login_returns_first_match() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_model(id, "alice")]])
            .into_connection();
        let dao = UserDao::new(&db);

        let result = dao
            .find_by_login("alice")
            .await
            .expect("query should succeed");
        assert_eq!(result.map(|u| u.id), Some(id));
    }

    #[tokio::test]
    async fn find_by_login_returns_none_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let dao = UserDao::new(&db);

        let result = dao
            .find_by_login("missing")
            .await
            .expect("query should succeed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn insert_if_absent_reports_whether_row_was_written() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();

        let inserted = UserDao::insert_if_absent_in(&db, new_user("alice"))
            .await
            .expect("insert should succeed");
        let conflicted = UserDao::insert_if_absent_in(&db, new_user("alice"))
            .await
            .expect("insert should succeed");

        assert!(inserted);
        assert!(!conflicted);
    }

    #[tokio::test]
    async fn set_password_hash_on_missing_user_is_not_found() {
        let missing_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let dao = UserDao::new(&db);

        let err = dao
            .set_password_hash(missing_id, "new-hash")
            .await
            .expect_err("update should fail");
        assert!(matches!(
            err,
            DaoLayerError::NotFound { id, .. } if id == missing_id
        ));
    }

    #[tokio::test]
    async fn set_password_hash_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("update failed".to_string())])
            .into_connection();
        let dao = UserDao::new(&db);

        let err = dao
            .set_password_hash(Uuid::new_v4(), "new-hash")
            .await
            .expect_err("update should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
