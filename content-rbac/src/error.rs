//! Error types for permission resolution

use thiserror::Error;

/// Permission store error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// The backing role/permission store failed
    #[error("Permission store error: {0}")]
    Store(String),

    /// A permission string could not be parsed
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),
}

/// Result type for permission resolution.
pub type RbacResult<T> = Result<T, RbacError>;
