//! Application error taxonomy.
//!
//! None of these are fatal: a failed operation is reported to the
//! originating connection only and never tears down the event loop.

use domain::DomainError;
use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Malformed input; reported to the caller, never broadcast.
    #[error("{0}")]
    Validation(String),

    /// Invalid or expired credential. Does not close the transport.
    #[error("{0}")]
    Authentication(String),

    /// Operating on a missing message/user/room.
    #[error("{0}")]
    NotFound(String),

    /// Storage collaborator failure. In-memory coordination state is not
    /// rolled back; clients recover via the next history replay.
    #[error("{0}")]
    Persistence(String),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { .. } | DomainError::AlreadyExists { .. } => {
                Self::Validation(err.to_string())
            }
            DomainError::PermissionDenied { .. } => Self::Authentication(err.to_string()),
            DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(resource) => Self::NotFound(resource),
            RepositoryError::Conflict(what) => Self::Validation(what),
            RepositoryError::Database(message) => Self::Persistence(message),
        }
    }
}
