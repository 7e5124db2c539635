use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{
    db::dao::DaoContext,
    services::{role_service::RoleService, session_store::SessionStore, user_service::UserService},
};

/// Hands out services that share one pool and one per-step database deadline.
#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
    deadline: Duration,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection, deadline: Duration) -> Self {
        Self {
            daos: DaoContext::new(db),
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.clone(), self.deadline)
    }

    pub fn role(&self) -> RoleService {
        RoleService::new(self.daos.clone(), self.deadline)
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.daos.session(), self.daos.history(), self.deadline)
    }
}
