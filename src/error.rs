use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Db(DbErr),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] image::ImageError),
    #[error("Identifier namespace for `{field}` exhausted after {attempts} attempts")]
    NamespaceExhausted { field: &'static str, attempts: u32 },
    #[error("Unique constraint conflict: {0}")]
    UniqueConflict(String),
    #[error("Copy to `{0}` could not be confirmed")]
    CopyNotConfirmed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Protected(String),
    #[error("Failed to validate: {0}")]
    Validation(String),
}

impl From<DbErr> for CatalogError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => CatalogError::UniqueConflict(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => CatalogError::Protected(detail),
            _ => CatalogError::Db(err),
        }
    }
}

impl CatalogError {
    /// Conflicts that a caller may retry with freshly resolved identifiers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::UniqueConflict(_))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_db_errors_stay_db_errors() {
        let err: CatalogError = DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, CatalogError::Db(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn exhaustion_message_names_the_field() {
        let err = CatalogError::NamespaceExhausted {
            field: "sku",
            attempts: 50,
        };
        assert_eq!(
            err.to_string(),
            "Identifier namespace for `sku` exhausted after 50 attempts"
        );
    }
}
