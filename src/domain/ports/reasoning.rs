//! Reasoning collaborator port.

use async_trait::async_trait;

use crate::domain::ports::errors::ReasoningError;

/// Opaque completion service: prompt in, free text out.
///
/// The classifier owns prompt construction and response parsing; this port
/// only moves text and reports typed transport failures.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;
}
