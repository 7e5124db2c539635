pub mod context;
pub mod role_service;
pub mod session_manager;
pub mod session_store;
pub mod user_service;

pub use context::ServiceContext;
pub use role_service::RoleService;
pub use session_manager::{AuthOutcome, SessionManager, UserProfile};
pub use session_store::{SessionEvent, SessionStore};
pub use user_service::UserService;
