//! Typed errors for the collaborator ports.
//!
//! Each error knows whether it is transient (worth retrying with backoff)
//! or permanent. The step executor only ever retries transient failures.

use thiserror::Error;

/// Errors from the reasoning collaborator.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    /// Rate limit exceeded, retry after waiting
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Service is overloaded, retry later
    #[error("Reasoning service overloaded")]
    Overloaded,

    /// Service encountered an internal error
    #[error("Reasoning service error: {0}")]
    ServerError(String),

    /// Request timed out waiting for a response
    #[error("Timeout waiting for reasoning response")]
    Timeout,

    /// Network error during the request
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication failed (invalid or missing API key)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Malformed request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything the service returned that fits no other bucket
    #[error("Unknown reasoning failure: {0}")]
    Unknown(String),
}

impl ReasoningError {
    /// Returns true if retrying could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Overloaded | Self::ServerError(_) | Self::Timeout | Self::Network(_)
        )
    }
}

/// Errors from the mail collaborator.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Network failure reaching the gateway
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway rejected the recipient address
    #[error("Recipient rejected: {0}")]
    Rejected(String),

    /// Sending quota exhausted
    #[error("Send quota exhausted")]
    Quota,

    /// Request timed out
    #[error("Timeout sending mail")]
    Timeout,
}

impl MailError {
    /// Quota and network failures may clear on retry; rejected addresses
    /// will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Quota | Self::Timeout)
    }
}

/// Errors from the ticket persistence collaborator.
///
/// Version conflicts are NOT errors — they come back as
/// [`super::WriteOutcome`] variants so the executor can end the run quietly.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store is temporarily unreachable
    #[error("Ticket store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_transient_classification() {
        assert!(ReasoningError::RateLimited.is_transient());
        assert!(ReasoningError::Timeout.is_transient());
        assert!(ReasoningError::ServerError("500".into()).is_transient());
        assert!(!ReasoningError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(!ReasoningError::InvalidRequest("bad body".into()).is_transient());
        assert!(!ReasoningError::Unknown("teapot".into()).is_transient());
    }

    #[test]
    fn test_mail_transient_classification() {
        assert!(MailError::Quota.is_transient());
        assert!(MailError::Network("reset".into()).is_transient());
        assert!(!MailError::Rejected("bad address".into()).is_transient());
    }
}
