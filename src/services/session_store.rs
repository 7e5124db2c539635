use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::dao::{
        HistoryDao, NewHistoryEntry, NewSession, PaginatedResponse, SessionDao, with_deadline,
    },
    db::entities::session_history,
    error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoginWithPassword,
    LoginWithOauth,
    RefreshTokenUpdate,
    UserLogout,
}

impl SessionEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEvent::LoginWithPassword => "LOGIN_WITH_PASSWORD",
            SessionEvent::LoginWithOauth => "LOGIN_WITH_OAUTH",
            SessionEvent::RefreshTokenUpdate => "REFRESH_TOKEN_UPDATE",
            SessionEvent::UserLogout => "USER_LOGOUT",
        }
    }
}

/// One audit row as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub event: String,
    pub device_info: String,
    pub refresh_token_id: Option<Uuid>,
    pub issued_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub expires_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<session_history::Model> for HistoryEntry {
    fn from(model: session_history::Model) -> Self {
        Self {
            id: model.id,
            event: model.event_kind,
            device_info: model.device_info,
            refresh_token_id: model.refresh_token_id,
            issued_at: model.issued_at,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}

/// Active sessions (one per user and device) and their audit trail.
#[derive(Clone)]
pub struct SessionStore {
    sessions: SessionDao,
    history: HistoryDao,
    deadline: Duration,
}

impl SessionStore {
    pub fn new(sessions: SessionDao, history: HistoryDao, deadline: Duration) -> Self {
        Self {
            sessions,
            history,
            deadline,
        }
    }

    pub async fn upsert_session(&self, session: NewSession) -> Result<(), AppError> {
        Ok(with_deadline(self.deadline, self.sessions.replace(session)).await?)
    }

    /// False when the device no longer holds `expected_refresh_id`.
    pub async fn rotate_session(
        &self,
        expected_refresh_id: Uuid,
        session: NewSession,
    ) -> Result<bool, AppError> {
        Ok(with_deadline(
            self.deadline,
            self.sessions.rotate(expected_refresh_id, session),
        )
        .await?)
    }

    pub async fn has_active_session(
        &self,
        user_id: Uuid,
        device_info: &str,
        refresh_token_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(with_deadline(
            self.deadline,
            self.sessions.exists(user_id, device_info, refresh_token_id),
        )
        .await?)
    }

    pub async fn delete_session(&self, user_id: Uuid, device_info: &str) -> Result<u64, AppError> {
        let removed = with_deadline(
            self.deadline,
            self.sessions.delete_for_device(user_id, device_info),
        )
        .await?;
        if removed == 0 {
            tracing::info!(user_id = %user_id, device = %device_info, "no active session to delete");
        }
        Ok(removed)
    }

    pub async fn append_history(&self, entry: NewHistoryEntry) -> Result<(), AppError> {
        Ok(with_deadline(self.deadline, self.history.append(entry)).await?)
    }

    /// Oldest first. `page_number` is 1-based; `page_size` is 1..=50.
    pub async fn list_history(
        &self,
        user_id: Uuid,
        page_size: u64,
        page_number: u64,
    ) -> Result<PaginatedResponse<HistoryEntry>, AppError> {
        let page = with_deadline(
            self.deadline,
            self.history.page_for_user(user_id, page_number, page_size),
        )
        .await?;

        Ok(PaginatedResponse {
            data: page.data.into_iter().map(HistoryEntry::from).collect(),
            page: page.page,
            page_size: page.page_size,
            has_next: page.has_next,
            total: page.total,
        })
    }
}
