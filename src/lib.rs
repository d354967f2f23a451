//! Triago - Asynchronous Support Ticket Triage
//!
//! Triago turns a `ticket.created` event into a classified, assigned and
//! notified ticket through a fixed four-step workflow (classify -> assign ->
//! persist -> notify) with bounded retry, idempotent redelivery handling and
//! per-recipient notification dedup.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits and domain errors
//! - **Service Layer** (`services`): The run registry, step executor and the
//!   pure assignment resolver
//! - **Infrastructure Layer** (`infrastructure`): HTTP collaborators,
//!   configuration loading, logging
//! - **CLI Layer** (`cli`): Command-line entry points
//!
//! # Example
//!
//! ```ignore
//! use triago::services::TriageService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire collaborators and feed ticket.created events
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Classification, Config, EventEnvelope, Handler, HandlerRole, LoggingConfig, MailConfig,
    ReasoningConfig, RegistryConfig, RetryConfig, Ticket, TicketCreated, TicketPriority,
    TicketStatus, TriagePatch, TriageRun, WorkflowConfig,
};
pub use domain::ports::{
    HandlerDirectory, MailError, Mailer, ReasoningError, ReasoningService, StoreError,
    TicketStore, WriteOutcome,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Admission, EventBus, IntakeStatus, RunRegistry, StepExecutor, TriageService};
