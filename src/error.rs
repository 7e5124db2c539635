use sea_orm::SqlErr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationFailed(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Unavailable(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}

impl From<crate::db::dao::DaoLayerError> for AppError {
    fn from(err: crate::db::dao::DaoLayerError) -> Self {
        use crate::db::dao::DaoLayerError;

        match err {
            DaoLayerError::NotFound { entity, id } => {
                tracing::debug!(entity, %id, "record not found");
                AppError::not_found("Record not found")
            }
            DaoLayerError::InvalidPagination { .. } => AppError::validation(err.to_string()),
            DaoLayerError::Timeout => {
                tracing::warn!("database operation timed out");
                AppError::unavailable("database operation timed out")
            }
            DaoLayerError::Db(db_err) => {
                if let Some(SqlErr::UniqueConstraintViolation(detail)) = db_err.sql_err() {
                    tracing::debug!(%detail, "unique constraint violated");
                    return AppError::conflict("Record already exists");
                }
                tracing::error!(error = %db_err, "database operation failed");
                AppError::unavailable("database operation failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;
    use uuid::Uuid;

    use super::AppError;
    use crate::db::dao::DaoLayerError;

    #[test]
    fn dao_not_found_maps_to_not_found() {
        let err = AppError::from(DaoLayerError::NotFound {
            entity: "auth_service::db::entities::user::Entity",
            id: Uuid::nil(),
        });

        assert_eq!(err, AppError::not_found("Record not found"));
    }

    #[test]
    fn dao_db_error_hides_driver_details() {
        let err = AppError::from(DaoLayerError::Db(DbErr::Custom(
            "connection reset by peer".to_string(),
        )));

        assert_eq!(err, AppError::unavailable("database operation failed"));
    }

    #[test]
    fn pagination_errors_are_validation_failures() {
        let err = AppError::from(DaoLayerError::InvalidPagination {
            page: 0,
            page_size: 10,
        });

        assert!(matches!(err, AppError::ValidationFailed(_)));
    }
}
