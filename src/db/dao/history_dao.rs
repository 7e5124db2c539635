use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult, PaginatedResponse};
use crate::db::entities::{prelude::SessionHistory, session_history};

#[derive(Clone)]
pub struct HistoryDao {
    db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub user_id: Option<Uuid>,
    pub device_info: String,
    pub refresh_token_id: Option<Uuid>,
    pub issued_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub expires_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub event_kind: String,
}

impl DaoBase for HistoryDao {
    type Entity = SessionHistory;
    const MAX_PAGE_SIZE: u64 = 50;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl HistoryDao {
    pub async fn append(&self, entry: NewHistoryEntry) -> DaoResult<()> {
        let row = session_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            refresh_token_id: Set(entry.refresh_token_id),
            issued_at: Set(entry.issued_at),
            expires_at: Set(entry.expires_at),
            device_info: Set(entry.device_info),
            event_kind: Set(entry.event_kind),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };
        SessionHistory::insert(row)
            .exec_without_returning(&self.db)
            .await
            .map(|_| ())
            .map_err(DaoLayerError::Db)
    }

    /// Oldest events first, together with the user's total event count.
    pub async fn page_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        page_size: u64,
    ) -> DaoResult<PaginatedResponse<session_history::Model>> {
        let mut response = self
            .find(
                page,
                page_size,
                Some((session_history::Column::CreatedAt, Order::Asc)),
                move |query| query.filter(session_history::Column::UserId.eq(user_id)),
            )
            .await?;

        let total = self
            .count(move |query| query.filter(session_history::Column::UserId.eq(user_id)))
            .await?;
        response.total = Some(total);
        Ok(response)
    }
}
