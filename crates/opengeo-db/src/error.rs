//! Database-specific error types and conversions.

use opengeo_core::error::OpenGeoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Corrupt record: {0}")]
    Decode(String),
}

impl From<DbError> for OpenGeoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => OpenGeoError::NotFound { entity, id },
            other => OpenGeoError::Database(other.to_string()),
        }
    }
}
