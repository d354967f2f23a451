//! Step executor: drives one run through classify -> assign -> persist ->
//! notify with per-step retry, stale-write rejection and cooperative
//! cancellation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::models::{
    Classification, Handler, RunOutcome, RunState, RunStep, StepStatus, TicketCreated,
    TicketStatus, TriagePatch, TriageRun,
};
use crate::domain::ports::{HandlerDirectory, StoreError, TicketStore, WriteOutcome};
use crate::services::backoff::BackoffPolicy;
use crate::services::classifier::{Classifier, ClassifyError};
use crate::services::events::{EventBus, TriageEventPayload, WorkflowCounters};
use crate::services::notifier::Notifier;
use crate::services::assignment;

/// What the persistence step decided.
enum PersistVerdict {
    Applied,
    /// The ticket vanished or a newer run already wrote; the run ends
    /// successfully with notification skipped.
    SkippedStale,
    Exhausted,
}

/// Executes the fixed step sequence for one run at a time.
///
/// Steps run strictly sequentially; the only suspension points are the
/// reasoning call, the persistence write and the mail sends. Cancellation is
/// checked before each step transition, never mid-call.
pub struct StepExecutor {
    classifier: Classifier,
    store: Arc<dyn TicketStore>,
    directory: Arc<dyn HandlerDirectory>,
    notifier: Notifier,
    backoff: BackoffPolicy,
    call_timeout: Duration,
    events: Arc<EventBus>,
    counters: Arc<WorkflowCounters>,
}

impl StepExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: Classifier,
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn HandlerDirectory>,
        notifier: Notifier,
        backoff: BackoffPolicy,
        call_timeout: Duration,
        events: Arc<EventBus>,
        counters: Arc<WorkflowCounters>,
    ) -> Self {
        Self {
            classifier,
            store,
            directory,
            notifier,
            backoff,
            call_timeout,
            events,
            counters,
        }
    }

    /// Drive the run to a terminal state. Never returns early on collaborator
    /// failure: classification falls back to defaults, stale writes end the
    /// run quietly, notification failures are per-recipient.
    pub async fn execute(
        &self,
        run: &mut TriageRun,
        event: &TicketCreated,
        cancel: &AtomicBool,
    ) -> RunOutcome {
        // ---- Classify -----------------------------------------------------
        if cancel.load(Ordering::SeqCst) {
            return self.finish_cancelled(run);
        }
        run.state = RunState::Classifying;
        run.classify.status = StepStatus::Running;
        let (classification, classification_defaulted) =
            self.classify_with_retry(run, event).await;

        // ---- Assign -------------------------------------------------------
        if cancel.load(Ordering::SeqCst) {
            return self.finish_cancelled(run);
        }
        run.state = RunState::Assigning;
        run.assign.status = StepStatus::Running;
        run.assign.attempts = 1;
        let pool = self.directory.list_candidates();
        let selected: Vec<Handler> = assignment::select(&classification.related_skills, &pool)
            .into_iter()
            .cloned()
            .collect();
        run.assign.status = StepStatus::Succeeded;
        self.events.publish(TriageEventPayload::HandlersSelected {
            run_id: run.id,
            count: selected.len(),
        });
        tracing::debug!(
            run_id = %run.id,
            ticket_id = %run.ticket_id,
            selected = selected.len(),
            "Handlers selected"
        );

        // ---- Persist ------------------------------------------------------
        if cancel.load(Ordering::SeqCst) {
            return self.finish_cancelled(run);
        }
        run.state = RunState::Persisting;
        run.persist.status = StepStatus::Running;
        let assigned_ids: Vec<Uuid> = selected.iter().map(|h| h.id).collect();
        let verdict = self
            .persist_with_retry(run, &classification, &assigned_ids)
            .await;

        let write_skipped = match verdict {
            PersistVerdict::Applied => false,
            PersistVerdict::SkippedStale => {
                // Never notify on a write we dropped.
                run.state = RunState::Succeeded;
                let outcome = RunOutcome::Succeeded {
                    assigned: assigned_ids.len(),
                    notified: 0,
                    notify_failed: 0,
                    classification_defaulted,
                    write_skipped: true,
                };
                self.finish_succeeded(run, 0, 0);
                return outcome;
            }
            PersistVerdict::Exhausted => {
                run.state = RunState::Exhausted {
                    step: RunStep::Persist,
                };
                WorkflowCounters::incr(&self.counters.runs_exhausted);
                self.events.publish(TriageEventPayload::RunExhausted {
                    run_id: run.id,
                    ticket_id: run.ticket_id,
                    step: RunStep::Persist,
                });
                tracing::error!(
                    run_id = %run.id,
                    ticket_id = %run.ticket_id,
                    "Run exhausted at persistence step"
                );
                return RunOutcome::Exhausted {
                    step: RunStep::Persist,
                };
            }
        };

        // ---- Notify -------------------------------------------------------
        if cancel.load(Ordering::SeqCst) {
            return self.finish_cancelled(run);
        }
        run.state = RunState::Notifying;
        run.notify.status = StepStatus::Running;
        run.notify.attempts = 1;

        let subject = format!("You have been assigned a ticket: {}", event.title);
        let body = notification_body(&event.title, &classification);
        let mut sent_set = HashSet::new();
        let report = self
            .notifier
            .fan_out(run.id, &selected, &subject, &body, &mut sent_set)
            .await;

        for handler_id in &report.sent {
            self.events.publish(TriageEventPayload::NotificationSent {
                run_id: run.id,
                handler_id: *handler_id,
            });
        }
        for (handler_id, reason) in &report.failed {
            self.events.publish(TriageEventPayload::NotificationFailed {
                run_id: run.id,
                handler_id: *handler_id,
                reason: reason.clone(),
            });
            tracing::warn!(
                run_id = %run.id,
                handler_id = %handler_id,
                reason,
                "Notification failed"
            );
        }
        WorkflowCounters::add(&self.counters.notifications_sent, report.sent.len() as u64);
        WorkflowCounters::add(
            &self.counters.notifications_failed,
            report.failed.len() as u64,
        );

        // Per-recipient failures never fail the run.
        run.notify.status = StepStatus::Succeeded;
        run.state = RunState::Succeeded;
        self.finish_succeeded(run, report.sent.len(), report.failed.len());

        RunOutcome::Succeeded {
            assigned: assigned_ids.len(),
            notified: report.sent.len(),
            notify_failed: report.failed.len(),
            classification_defaulted,
            write_skipped,
        }
    }

    fn finish_succeeded(&self, run: &TriageRun, notified: usize, notify_failed: usize) {
        WorkflowCounters::incr(&self.counters.runs_succeeded);
        self.events.publish(TriageEventPayload::RunSucceeded {
            run_id: run.id,
            ticket_id: run.ticket_id,
            notified,
            notify_failed,
        });
        tracing::info!(
            run_id = %run.id,
            ticket_id = %run.ticket_id,
            notified,
            notify_failed,
            "Triage run succeeded"
        );
    }

    fn finish_cancelled(&self, run: &mut TriageRun) -> RunOutcome {
        run.state = RunState::Cancelled;
        WorkflowCounters::incr(&self.counters.runs_cancelled);
        self.events.publish(TriageEventPayload::RunCancelled {
            run_id: run.id,
            ticket_id: run.ticket_id,
        });
        tracing::warn!(run_id = %run.id, ticket_id = %run.ticket_id, "Triage run cancelled");
        RunOutcome::Cancelled
    }

    /// Classify with bounded retry. Transient failures back off and retry;
    /// exhaustion or a malformed response falls back to the default
    /// classification — a ticket is never stuck unclassified because the
    /// reasoning collaborator is flaky.
    async fn classify_with_retry(
        &self,
        run: &mut TriageRun,
        event: &TicketCreated,
    ) -> (Classification, bool) {
        let max = self.backoff.max_attempts();
        loop {
            run.classify.attempts += 1;
            let attempt = run.classify.attempts;

            let failure = match tokio::time::timeout(
                self.call_timeout,
                self.classifier.classify(&event.title, &event.description),
            )
            .await
            {
                Ok(Ok(classification)) => {
                    run.classify.status = StepStatus::Succeeded;
                    return (classification, false);
                }
                Ok(Err(ClassifyError::Malformed(reason))) => {
                    run.classify.status = StepStatus::Failed {
                        reason: reason.clone(),
                    };
                    return (self.default_classification(run, &reason), true);
                }
                Ok(Err(ClassifyError::Transient(err))) => err.to_string(),
                Err(_) => "reasoning call timed out".to_string(),
            };

            if attempt >= max {
                run.classify.status = StepStatus::Exhausted;
                self.events.publish(TriageEventPayload::StepExhausted {
                    run_id: run.id,
                    step: RunStep::Classify,
                    attempts: attempt,
                });
                return (self.default_classification(run, &failure), true);
            }

            let delay = self.backoff.delay_for(run.id, attempt - 1);
            run.state = RunState::Retrying {
                step: RunStep::Classify,
                attempt,
            };
            self.events.publish(TriageEventPayload::StepRetrying {
                run_id: run.id,
                step: RunStep::Classify,
                attempt,
                delay_ms: delay.as_millis() as u64,
            });
            tracing::warn!(
                run_id = %run.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                failure,
                "Classification failed, retrying"
            );
            tokio::time::sleep(delay).await;
            run.state = RunState::Classifying;
        }
    }

    fn default_classification(&self, run: &TriageRun, reason: &str) -> Classification {
        WorkflowCounters::incr(&self.counters.classification_fallbacks);
        self.events
            .publish(TriageEventPayload::ClassificationDefaulted {
                run_id: run.id,
                reason: reason.to_string(),
            });
        tracing::warn!(
            run_id = %run.id,
            ticket_id = %run.ticket_id,
            reason,
            "Classification fell back to defaults"
        );
        Classification::fallback()
    }

    /// Persist with bounded retry for transient store failures only.
    /// Version conflicts are terminal for the write, not retriable.
    async fn persist_with_retry(
        &self,
        run: &mut TriageRun,
        classification: &Classification,
        assigned: &[Uuid],
    ) -> PersistVerdict {
        let max = self.backoff.max_attempts();
        loop {
            run.persist.attempts += 1;
            let attempt = run.persist.attempts;

            let failure = match self.try_persist(run, classification, assigned).await {
                Ok(Some(())) => {
                    run.persist.status = StepStatus::Succeeded;
                    return PersistVerdict::Applied;
                }
                Ok(None) => {
                    run.persist.status = StepStatus::Succeeded;
                    WorkflowCounters::incr(&self.counters.stale_writes_skipped);
                    self.events.publish(TriageEventPayload::StaleWriteSkipped {
                        run_id: run.id,
                        ticket_id: run.ticket_id,
                    });
                    tracing::info!(
                        run_id = %run.id,
                        ticket_id = %run.ticket_id,
                        "Stale or missing ticket, write dropped"
                    );
                    return PersistVerdict::SkippedStale;
                }
                Err(err) => err,
            };

            if attempt >= max {
                run.persist.status = StepStatus::Exhausted;
                self.events.publish(TriageEventPayload::StepExhausted {
                    run_id: run.id,
                    step: RunStep::Persist,
                    attempts: attempt,
                });
                return PersistVerdict::Exhausted;
            }

            let delay = self.backoff.delay_for(run.id, attempt - 1);
            run.state = RunState::Retrying {
                step: RunStep::Persist,
                attempt,
            };
            self.events.publish(TriageEventPayload::StepRetrying {
                run_id: run.id,
                step: RunStep::Persist,
                attempt,
                delay_ms: delay.as_millis() as u64,
            });
            tracing::warn!(
                run_id = %run.id,
                attempt,
                error = %failure,
                "Persistence failed, retrying"
            );
            tokio::time::sleep(delay).await;
            run.state = RunState::Persisting;
        }
    }

    /// One persistence attempt. `Ok(Some(()))` applied, `Ok(None)` dropped as
    /// stale, `Err` transient store failure.
    async fn try_persist(
        &self,
        run: &TriageRun,
        classification: &Classification,
        assigned: &[Uuid],
    ) -> Result<Option<()>, StoreError> {
        let snapshot = tokio::time::timeout(self.call_timeout, self.store.get(run.ticket_id))
            .await
            .map_err(|_| StoreError::Unavailable("ticket store read timed out".to_string()))??;

        let Some(ticket) = snapshot else {
            return Ok(None);
        };
        // Last-applicable-event-wins: a newer run's stamp means this write
        // would be stale even if the CAS would pass.
        if ticket.last_workflow_version > run.epoch {
            return Ok(None);
        }

        let patch = TriagePatch {
            priority: classification.priority,
            summary: non_empty(&classification.summary),
            helpful_notes: non_empty(&classification.helpful_notes),
            related_skills: classification.related_skills.clone(),
            assigned_to: assigned.to_vec(),
            status: TicketStatus::InProgress,
            workflow_version: run.epoch,
        };

        let outcome = tokio::time::timeout(
            self.call_timeout,
            self.store.apply_triage(run.ticket_id, patch, ticket.version),
        )
        .await
        .map_err(|_| StoreError::Unavailable("ticket store write timed out".to_string()))??;

        match outcome {
            WriteOutcome::Applied { .. } => Ok(Some(())),
            WriteOutcome::StaleVersion | WriteOutcome::NotFound => Ok(None),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn notification_body(title: &str, classification: &Classification) -> String {
    if classification.summary.is_empty() {
        format!("Ticket \"{title}\" has been assigned to you.")
    } else {
        format!(
            "Ticket \"{title}\" has been assigned to you.\n\nSummary: {}",
            classification.summary
        )
    }
}
