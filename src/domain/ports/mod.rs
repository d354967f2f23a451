//! Port traits for the workflow's external collaborators.

pub mod errors;
pub mod handler_directory;
pub mod mailer;
pub mod reasoning;
pub mod ticket_store;

pub use errors::{MailError, ReasoningError, StoreError};
pub use handler_directory::HandlerDirectory;
pub use mailer::Mailer;
pub use reasoning::ReasoningService;
pub use ticket_store::{TicketStore, WriteOutcome};
