use sea_orm::{
    entity::prelude::*,
    sea_query::{Index, IndexCreateStatement},
};

/// One row per (user, device). Replaced wholesale on login and refresh.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "active_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_id: Uuid,
    pub issued_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
    pub device_info: String,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

/// Every session lookup filters on both columns, user first.
pub fn device_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_active_sessions_user_device")
        .table(Entity)
        .col(Column::UserId)
        .col(Column::DeviceInfo)
        .to_owned()
}
