#[allow(unused_imports)]
pub mod prelude {
    pub use super::active_session::Entity as ActiveSession;
    pub use super::role::Entity as Role;
    pub use super::session_history::Entity as SessionHistory;
    pub use super::user::Entity as User;
    pub use super::user_role::Entity as UserRole;
}

pub mod active_session;
pub mod role;
pub mod session_history;
pub mod user;
pub mod user_role;
