use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use models::errors::ModelError;

/// Failures of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("store error: {0}")]
    Backend(String),
}

impl From<DbErr> for StoreError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::UniqueViolation(msg),
            _ => Self::Backend(e.to_string()),
        }
    }
}

impl From<ModelError> for StoreError {
    fn from(e: ModelError) -> Self { Self::Backend(e.to_string()) }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => Self::InvalidArgument(msg),
            ModelError::Db(msg) => Self::Store(StoreError::Backend(msg)),
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self { Self::Store(e.into()) }
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidArgument(msg.into()) }

    /// HTTP status the response layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::InvalidArgument(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::Store(_) => 500,
        }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::InvalidArgument(_) => 2001,
            ServiceError::NotFound(_) => 2002,
            ServiceError::Forbidden(_) => 2003,
            ServiceError::Store(StoreError::UniqueViolation(_)) => 2101,
            ServiceError::Store(StoreError::Backend(_)) => 2100,
        }
    }
}
