//! Domain error definitions.

use thiserror::Error;

/// Errors produced by domain-level validation and invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed input (empty content, bad room name, ...).
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// An operation that the acting identity is not allowed to perform.
    #[error("permission denied: {action}")]
    PermissionDenied { action: String },

    /// Referenced entity does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Unique constraint violated (duplicate room name, username, email).
    #[error("{resource} already exists: {identifier}")]
    AlreadyExists { resource: String, identifier: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(resource: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            identifier: identifier.into(),
        }
    }
}
