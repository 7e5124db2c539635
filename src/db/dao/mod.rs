use sea_orm::DatabaseConnection;

pub mod base;
pub mod base_traits;
pub mod error;
pub mod history_dao;
pub mod role_dao;
pub mod session_dao;
pub mod user_dao;
pub mod user_role_dao;

pub use base::{DaoBase, PaginatedResponse, with_deadline};
pub use base_traits::HasCreatedAtColumn;
pub use error::{DaoLayerError, DaoResult};
pub use history_dao::{HistoryDao, NewHistoryEntry};
pub use role_dao::RoleDao;
pub use session_dao::{NewSession, SessionDao};
pub use user_dao::{NewUser, UserDao};
pub use user_role_dao::UserRoleDao;

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn user(&self) -> UserDao {
        DaoBase::new(&self.db)
    }

    pub fn role(&self) -> RoleDao {
        DaoBase::new(&self.db)
    }

    pub fn session(&self) -> SessionDao {
        DaoBase::new(&self.db)
    }

    pub fn history(&self) -> HistoryDao {
        DaoBase::new(&self.db)
    }
}
