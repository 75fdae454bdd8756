//! Contract error types for the loop service
//!
//! These errors are transport-agnostic and used for inter-module communication.

/// Loop service domain errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    /// Loop, task, document, organization or user not found
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource type (loop, task, document, organization, user, image)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Role or ownership check failed
    #[error("Access denied: {reason}")]
    Forbidden {
        /// Why access was refused
        reason: String,
    },
    /// Missing or malformed input
    #[error("Validation error: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },
    /// Unique constraint violation (duplicate organization name, ...)
    #[error("Conflict: {reason}")]
    Conflict {
        /// Conflict reason
        reason: String,
    },
    /// Unexpected store failure
    #[error("Internal error")]
    Internal,
}

impl LoopError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}
