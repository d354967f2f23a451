//! Domain errors for the triage workflow.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the triage system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
