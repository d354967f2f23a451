//! Triage service: the composition root of the workflow.
//!
//! Accepts `ticket.created` events without blocking the caller, spawns one
//! task per admitted run, re-admits queued conflicting events when a run
//! retires, and supports cooperative cancellation and graceful drain.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::domain::models::{Config, TicketCreated};
use crate::domain::ports::{HandlerDirectory, Mailer, ReasoningService, TicketStore};
use crate::services::backoff::BackoffPolicy;
use crate::services::classifier::Classifier;
use crate::services::events::{CountersSnapshot, EventBus, TriageEvent, TriageEventPayload, WorkflowCounters};
use crate::services::executor::StepExecutor;
use crate::services::notifier::Notifier;
use crate::services::run_registry::{Admission, RunRegistry};

/// How the service disposed of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStatus {
    /// A run was admitted and is executing in the background.
    Started { run_id: Uuid },
    /// Already handled (terminal run exists for the idempotency key).
    Duplicate,
    /// A run is active for this ticket; the event will run after it.
    Queued,
}

/// Owns the run registry, the step executor and the background run tasks.
pub struct TriageService {
    registry: Arc<RunRegistry>,
    executor: Arc<StepExecutor>,
    events: Arc<EventBus>,
    counters: Arc<WorkflowCounters>,
    tasks: tokio::sync::Mutex<JoinSet<()>>,
}

impl TriageService {
    /// Wire the workflow from configuration and collaborator ports.
    pub fn new(
        config: &Config,
        reasoning: Arc<dyn ReasoningService>,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn HandlerDirectory>,
    ) -> Self {
        let events = Arc::new(EventBus::default());
        let counters = Arc::new(WorkflowCounters::default());
        let backoff = BackoffPolicy::new(&config.retry);
        let call_timeout = Duration::from_secs(config.workflow.call_timeout_secs);

        let classifier = Classifier::new(reasoning, config.reasoning.max_description_chars);
        let notifier = Notifier::new(
            mailer,
            backoff.clone(),
            config.workflow.max_in_flight_notifications,
            call_timeout,
        );
        let executor = Arc::new(StepExecutor::new(
            classifier,
            store,
            directory,
            notifier,
            backoff,
            call_timeout,
            Arc::clone(&events),
            Arc::clone(&counters),
        ));

        Self {
            registry: Arc::new(RunRegistry::new(&config.registry)),
            executor,
            events,
            counters,
            tasks: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    /// Present an event to the workflow. Returns immediately; the run (if
    /// admitted) executes on a background task.
    pub async fn handle_event(&self, event: TicketCreated) -> IntakeStatus {
        match self.registry.admit(&event) {
            Admission::Admitted { run, cancel } => {
                let run_id = run.id;
                WorkflowCounters::incr(&self.counters.runs_admitted);
                self.events.publish(TriageEventPayload::RunAdmitted {
                    run_id,
                    ticket_id: run.ticket_id,
                });
                self.spawn_run(run, event, cancel).await;
                IntakeStatus::Started { run_id }
            }
            Admission::Duplicate => {
                WorkflowCounters::incr(&self.counters.events_duplicate);
                self.events.publish(TriageEventPayload::EventDuplicate {
                    ticket_id: event.ticket_id,
                    idempotency_key: event.dedup_key(),
                });
                tracing::debug!(
                    ticket_id = %event.ticket_id,
                    idempotency_key = %event.dedup_key(),
                    "Duplicate delivery ignored"
                );
                IntakeStatus::Duplicate
            }
            Admission::Queued => {
                WorkflowCounters::incr(&self.counters.events_queued);
                self.events.publish(TriageEventPayload::EventQueued {
                    ticket_id: event.ticket_id,
                });
                tracing::debug!(ticket_id = %event.ticket_id, "Event queued behind active run");
                IntakeStatus::Queued
            }
        }
    }

    async fn spawn_run(
        &self,
        run: crate::domain::models::TriageRun,
        event: TicketCreated,
        cancel: Arc<std::sync::atomic::AtomicBool>,
    ) {
        let registry = Arc::clone(&self.registry);
        let executor = Arc::clone(&self.executor);
        let events = Arc::clone(&self.events);
        let counters = Arc::clone(&self.counters);

        let mut tasks = self.tasks.lock().await;
        tasks.spawn(async move {
            let mut run = run;
            let mut event = event;
            let mut cancel = cancel;
            loop {
                let outcome = executor.execute(&mut run, &event, &cancel).await;
                let ticket_id = run.ticket_id;
                registry.retire(&run, outcome);

                // Drain events that queued behind this run.
                let mut next = None;
                while let Some(queued) = registry.take_next_queued(ticket_id) {
                    match registry.admit(&queued) {
                        Admission::Admitted {
                            run: next_run,
                            cancel: next_cancel,
                        } => {
                            WorkflowCounters::incr(&counters.runs_admitted);
                            events.publish(TriageEventPayload::RunAdmitted {
                                run_id: next_run.id,
                                ticket_id,
                            });
                            next = Some((next_run, queued, next_cancel));
                            break;
                        }
                        Admission::Duplicate => {
                            WorkflowCounters::incr(&counters.events_duplicate);
                            events.publish(TriageEventPayload::EventDuplicate {
                                ticket_id,
                                idempotency_key: queued.dedup_key(),
                            });
                        }
                        // Another intake re-admitted for this ticket first;
                        // its run task owns the queue now.
                        Admission::Queued => break,
                    }
                }

                match next {
                    Some((next_run, next_event, next_cancel)) => {
                        run = next_run;
                        event = next_event;
                        cancel = next_cancel;
                    }
                    None => break,
                }
            }
        });
    }

    /// Cooperatively cancel the active run for a ticket (e.g. the ticket was
    /// deleted). Checked before each step transition, not pre-emptive.
    pub fn cancel(&self, ticket_id: Uuid) -> bool {
        self.registry.cancel(ticket_id)
    }

    /// Wait for all in-flight runs (and their queued follow-ups) to retire.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.events.subscribe()
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }
}
