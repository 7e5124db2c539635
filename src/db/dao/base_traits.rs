pub trait HasCreatedAtColumn: sea_orm::EntityTrait {
    fn created_at_column() -> Self::Column;
}

/// Wires an entity module into the DAO layer's default ordering.
macro_rules! created_at_column {
    ($($module:ident),+ $(,)?) => {
        $(
            impl $crate::db::dao::base_traits::HasCreatedAtColumn
                for $crate::db::entities::$module::Entity
            {
                fn created_at_column() -> Self::Column {
                    $crate::db::entities::$module::Column::CreatedAt
                }
            }
        )+
    };
}

created_at_column!(user, role, active_session, session_history);
