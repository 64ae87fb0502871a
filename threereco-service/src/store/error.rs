use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(String),

    /// A row still referenced elsewhere, or pointing at a row that does
    /// not exist.
    #[error("{0} violates a reference constraint")]
    Referenced(String),

    #[error("{0} row {1} disappeared during the transaction")]
    Missing(&'static str, uuid::Uuid),

    #[error("no audit user bound to transaction writing {0}")]
    AuditAttributionMissing(&'static str),

    #[error("row could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend failure: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let what = db_err
                    .constraint()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "record".to_string());
                return StoreError::Conflict(what);
            }
            if db_err.is_foreign_key_violation() {
                let what = db_err
                    .constraint()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "record".to_string());
                return StoreError::Referenced(what);
            }
        }
        StoreError::Backend(anyhow::Error::new(err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => AppError::conflict(format!("{} already exists", what)),
            StoreError::Referenced(_) => {
                AppError::conflict("The change conflicts with related records")
            }
            StoreError::Missing(table, id) => {
                AppError::not_found(format!("{} {} not found", table, id))
            }
            StoreError::AuditAttributionMissing(table) => {
                AppError::AuditAttributionMissing(table.to_string())
            }
            StoreError::Serialization(e) => AppError::InternalError(anyhow::Error::new(e)),
            StoreError::Backend(e) => AppError::DatabaseError(e),
        }
    }
}
