//! Audit and remark errors.

use haulage_shared::AppError;
use haulage_shared::types::RemarkId;
use thiserror::Error;

/// Errors raised by remark operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Remark text was empty or whitespace.
    #[error("Remark text is required")]
    EmptyRemark,

    /// No remark with this id on the document.
    #[error("Remark {0} not found")]
    RemarkNotFound(RemarkId),

    /// Only the author may edit or delete a remark.
    #[error("Only the author can change this remark")]
    NotRemarkAuthor,
}

impl AuditError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyRemark => 400,
            Self::RemarkNotFound(_) => 404,
            Self::NotRemarkAuthor => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyRemark => "EMPTY_REMARK",
            Self::RemarkNotFound(_) => "REMARK_NOT_FOUND",
            Self::NotRemarkAuthor => "NOT_REMARK_AUTHOR",
        }
    }
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::EmptyRemark => Self::Validation(err.to_string()),
            AuditError::RemarkNotFound(_) => Self::NotFound(err.to_string()),
            AuditError::NotRemarkAuthor => Self::Forbidden(err.to_string()),
        }
    }
}
