use thiserror::Error;

use crate::forms::FormErrors;

#[derive(Error, Debug)]
pub enum ForumError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("permission denied")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    ValidationFailed(FormErrors),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<FormErrors> for ForumError {
    fn from(errors: FormErrors) -> Self {
        ForumError::ValidationFailed(errors)
    }
}

pub type ForumResult<T> = Result<T, ForumError>;
