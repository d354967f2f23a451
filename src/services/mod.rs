//! Service layer: the triage workflow itself.

pub mod assignment;
pub mod backoff;
pub mod classifier;
pub mod events;
pub mod executor;
pub mod notifier;
pub mod run_registry;
pub mod triage;

pub use backoff::BackoffPolicy;
pub use classifier::{Classifier, ClassifyError};
pub use events::{EventBus, TriageEvent, TriageEventPayload, WorkflowCounters};
pub use executor::StepExecutor;
pub use notifier::{NotificationReport, Notifier};
pub use run_registry::{Admission, RunRegistry, TerminalRun};
pub use triage::{IntakeStatus, TriageService};
