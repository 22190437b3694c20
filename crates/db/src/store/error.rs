//! Store error types.

use haulage_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by document store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id in the organisation.
    #[error("{collection} document {id} not found")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Document id.
        id: Uuid,
    },

    /// The stored version moved on since the document was read.
    #[error("{collection} document {id} was modified concurrently, reload and retry")]
    Conflict {
        /// Collection written.
        collection: String,
        /// Document id.
        id: Uuid,
        /// Version the writer expected.
        expected: i64,
    },

    /// `(collection, organizationId, code)` already taken.
    #[error("Code {code} is already used in {collection}")]
    DuplicateCode {
        /// Collection written.
        collection: String,
        /// The clashing code.
        code: String,
    },

    /// Document body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } | Self::DuplicateCode { .. } => 409,
            Self::Serialization(_) | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "DOCUMENT_NOT_FOUND",
            Self::Conflict { .. } => "VERSION_CONFLICT",
            Self::DuplicateCode { .. } => "DUPLICATE_CODE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict { .. } | StoreError::DuplicateCode { .. } => {
                Self::Conflict(err.to_string())
            }
            StoreError::Serialization(_) => Self::Internal(err.to_string()),
            StoreError::Database(msg) => Self::Database(msg),
        }
    }
}
