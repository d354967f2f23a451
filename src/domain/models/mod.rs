//! Domain models for tickets, handlers, runs and configuration.

pub mod classification;
pub mod config;
pub mod event;
pub mod handler;
pub mod run;
pub mod ticket;

pub use classification::Classification;
pub use config::{
    Config, LoggingConfig, MailConfig, ReasoningConfig, RegistryConfig, RetryConfig,
    WorkflowConfig,
};
pub use event::{EventEnvelope, TicketCreated, TICKET_CREATED};
pub use handler::{Handler, HandlerRole};
pub use run::{RunOutcome, RunState, RunStep, StepRecord, StepStatus, TriageRun};
pub use ticket::{Ticket, TicketPriority, TicketStatus, TriagePatch};
