//! Database error types
//!
//! `DatabaseError` is the store-internal error representation; call sites
//! outside this crate see `floracat_core::FloraCatError` (see the `From`
//! impl below).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => DatabaseError::Query(db_err.to_string()),
            sqlx::Error::Io(io_err) => DatabaseError::Connection(io_err.to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::Connection("pool timed out".to_string()),
            other => DatabaseError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl From<DatabaseError> for floracat_core::FloraCatError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => floracat_core::FloraCatError::LocationUnresolved(msg),
            other => floracat_core::FloraCatError::Database(other.to_string()),
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
