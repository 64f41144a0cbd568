//! Error types for the Postgres store

use price_tracker::{HistoryError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgStoreError {
    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PgStoreError {
    /// Map a unique-constraint violation to `AlreadyExists`
    pub(crate) fn on_conflict(err: sqlx::Error, entity: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::AlreadyExists { entity },
            _ => Self::DatabaseError(err),
        }
    }
}

impl From<PgStoreError> for StoreError {
    fn from(err: PgStoreError) -> Self {
        match err {
            PgStoreError::AlreadyExists { entity } => StoreError::AlreadyExists { entity },
            PgStoreError::NotFound { entity } => StoreError::NotFound { entity },
            other => StoreError::backend(other.to_string()),
        }
    }
}

impl From<PgStoreError> for HistoryError {
    fn from(err: PgStoreError) -> Self {
        HistoryError::storage(err.to_string())
    }
}
