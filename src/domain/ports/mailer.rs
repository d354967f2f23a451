//! Mail collaborator port.

use async_trait::async_trait;

use crate::domain::ports::errors::MailError;

/// Opaque mail transport: recipient, subject and body in; typed result out.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
