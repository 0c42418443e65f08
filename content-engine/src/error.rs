//! Error types for content operations
//!
//! [`CrudError`] is what callers of the engine see. Its messages are safe to
//! show to end users; underlying persistence causes are logged instead of
//! being carried along.

use thiserror::Error;

/// User-facing message for uniqueness violations.
pub const CONFLICT_MESSAGE: &str = "Duplicate entity, check unique fields";

/// User-facing message for failures whose cause must not be exposed.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong. Please try again later or contact us.";

/// Content operation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrudError {
    /// User holds none of the view permissions for the resource
    #[error("Unauthorized")]
    Unauthorized,

    /// User may see the entity but not perform the requested change
    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    /// Entity does not exist or is hidden from the user
    #[error("Entity not found")]
    NotFound,

    /// Persistence rejected the entity because of a unique constraint
    #[error("{0}")]
    Conflict(String),

    /// Invalid input, or a persistence failure that is not a conflict
    #[error("{0}")]
    UnprocessableEntity(String),
}

/// Result type for content operations.
pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
    /// Conflict with the standard duplicate-entity message.
    pub fn conflict() -> Self {
        CrudError::Conflict(CONFLICT_MESSAGE.to_string())
    }

    /// Unprocessable entity with the generic retry/contact-us message.
    pub fn unprocessable() -> Self {
        CrudError::UnprocessableEntity(GENERIC_FAILURE_MESSAGE.to_string())
    }

    /// Unprocessable entity for a bad caller-supplied value.
    pub fn invalid(message: impl Into<String>) -> Self {
        CrudError::UnprocessableEntity(message.into())
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CrudError::Unauthorized => 401,
            CrudError::Forbidden => 403,
            CrudError::NotFound => 404,
            CrudError::Conflict(_) => 409,
            CrudError::UnprocessableEntity(_) => 422,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CrudError::Unauthorized => "UNAUTHORIZED",
            CrudError::Forbidden => "FORBIDDEN",
            CrudError::NotFound => "NOT_FOUND",
            CrudError::Conflict(_) => "CONFLICT",
            CrudError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
        }
    }
}
