//! End-to-end workflow tests over in-memory collaborators.

mod common;

use std::sync::Arc;

use common::{
    fast_config, good_response, moderator_pool, ticket_and_event, RecordingMailer,
    ScriptedReasoning,
};
use triago::domain::models::{TicketPriority, TicketStatus, TriagePatch};
use triago::domain::ports::{ReasoningError, TicketStore};
use triago::infrastructure::memory::{InMemoryHandlerDirectory, InMemoryTicketStore};
use triago::services::{IntakeStatus, TriageService};

struct Harness {
    service: TriageService,
    store: Arc<InMemoryTicketStore>,
    mailer: Arc<RecordingMailer>,
    reasoning: Arc<ScriptedReasoning>,
}

fn harness(reasoning: ScriptedReasoning) -> Harness {
    let reasoning = Arc::new(reasoning);
    let mailer = Arc::new(RecordingMailer::new());
    let store = Arc::new(InMemoryTicketStore::new());
    let reasoning_port: Arc<dyn triago::domain::ports::ReasoningService> = reasoning.clone();
    let mailer_port: Arc<dyn triago::domain::ports::Mailer> = mailer.clone();
    let store_port: Arc<dyn TicketStore> = store.clone();
    let directory = Arc::new(InMemoryHandlerDirectory::new(moderator_pool()));

    let service = TriageService::new(
        &fast_config(),
        reasoning_port,
        mailer_port,
        store_port,
        directory,
    );
    Harness {
        service,
        store,
        mailer,
        reasoning,
    }
}

#[tokio::test]
async fn happy_path_classifies_assigns_persists_and_notifies() {
    let h = harness(ScriptedReasoning::always_good());
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    let status = h.service.handle_event(event.clone()).await;
    assert!(matches!(status, IntakeStatus::Started { .. }));
    h.service.drain().await;

    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.priority, TicketPriority::High);
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert_eq!(stored.summary.as_deref(), Some("VPN drops every ten minutes"));
    assert_eq!(stored.related_skills, vec!["networking".to_string()]);
    assert_eq!(stored.assigned_to.len(), 1);
    assert_eq!(stored.version, 2);
    assert_eq!(stored.last_workflow_version, 1);

    assert_eq!(h.mailer.sent_count(), 1);
    let sends = h.mailer.sends.lock().unwrap();
    assert_eq!(sends[0].0, "m1@example.com");
    assert!(sends[0].1.contains("VPN drops"));
    assert!(sends[0].2.contains("VPN drops every ten minutes"));
    drop(sends);

    let counters = h.service.counters();
    assert_eq!(counters.runs_admitted, 1);
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.notifications_sent, 1);
}

#[tokio::test]
async fn replaying_a_terminal_event_produces_no_side_effects() {
    let h = harness(ScriptedReasoning::always_good());
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event.clone()).await;
    h.service.drain().await;
    let version_after_first = h.store.get(ticket.id).await.unwrap().unwrap().version;
    let sends_after_first = h.mailer.sent_count();

    let status = h.service.handle_event(event).await;
    assert_eq!(status, IntakeStatus::Duplicate);
    h.service.drain().await;

    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.version, version_after_first);
    assert_eq!(h.mailer.sent_count(), sends_after_first);
    assert_eq!(h.service.counters().events_duplicate, 1);
    assert_eq!(h.service.counters().runs_succeeded, 1);
}

#[tokio::test]
async fn malformed_output_falls_back_and_the_run_still_completes() {
    let h = harness(ScriptedReasoning::new(vec![Ok("not json at all".into())]));
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event).await;
    h.service.drain().await;

    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.priority, TicketPriority::Unset);
    assert!(stored.related_skills.is_empty());
    assert!(stored.assigned_to.is_empty());
    // Persist and notify still ran; the ticket is in progress, unassigned.
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert_eq!(h.mailer.sent_count(), 0);

    let counters = h.service.counters();
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.classification_fallbacks, 1);
    // Malformed output is never retried.
    assert_eq!(h.reasoning.calls(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_then_succeeds() {
    let h = harness(ScriptedReasoning::new(vec![
        Err(ReasoningError::RateLimited),
        Ok(good_response()),
    ]));
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event).await;
    h.service.drain().await;

    assert_eq!(h.reasoning.calls(), 2);
    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.priority, TicketPriority::High);
    assert_eq!(h.service.counters().classification_fallbacks, 0);
}

#[tokio::test]
async fn transient_exhaustion_falls_back_in_bounded_time() {
    let h = harness(ScriptedReasoning::new(vec![
        Err(ReasoningError::Timeout),
        Err(ReasoningError::ServerError("boom".into())),
        Err(ReasoningError::RateLimited),
    ]));
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event).await;
    h.service.drain().await;

    // max_attempts = 3, then the default classification keeps the run moving.
    assert_eq!(h.reasoning.calls(), 3);
    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.priority, TicketPriority::Unset);
    assert_eq!(stored.status, TicketStatus::InProgress);

    let counters = h.service.counters();
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.classification_fallbacks, 1);
}

#[tokio::test]
async fn failed_recipient_never_fails_the_run_and_replay_notifies_nobody() {
    let response = r#"{"summary":"s","priority":"low","relatedSkills":["networking","python"]}"#;
    let h = harness(ScriptedReasoning::new(vec![Ok(response.into())]));
    h.mailer.reject_address("m1@example.com");
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event.clone()).await;
    h.service.drain().await;

    let counters = h.service.counters();
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.notifications_sent, 1);
    assert_eq!(counters.notifications_failed, 1);
    assert_eq!(h.mailer.recipients(), vec!["m2@example.com".to_string()]);

    // Replay: dedup holds, nobody is notified again.
    assert_eq!(h.service.handle_event(event).await, IntakeStatus::Duplicate);
    h.service.drain().await;
    assert_eq!(h.mailer.sent_count(), 1);
}

#[tokio::test]
async fn stale_write_is_dropped_and_newer_data_survives() {
    let h = harness(ScriptedReasoning::always_good());
    let (ticket, event) = ticket_and_event();
    let ticket_id = ticket.id;
    h.store.insert(ticket);

    // A causally newer run already wrote: priority medium, stamp 5.
    let newer = TriagePatch {
        priority: TicketPriority::Medium,
        summary: Some("newer summary".into()),
        helpful_notes: None,
        related_skills: vec![],
        assigned_to: vec![],
        status: TicketStatus::InProgress,
        workflow_version: 5,
    };
    h.store.apply_triage(ticket_id, newer, 1).await.unwrap();

    // This event admits a run with epoch 1 < 5; its write must be dropped.
    h.service.handle_event(event).await;
    h.service.drain().await;

    let stored = h.store.get(ticket_id).await.unwrap().unwrap();
    assert_eq!(stored.priority, TicketPriority::Medium);
    assert_eq!(stored.summary.as_deref(), Some("newer summary"));
    assert_eq!(stored.last_workflow_version, 5);
    assert_eq!(h.mailer.sent_count(), 0, "skipped write must skip notification");

    let counters = h.service.counters();
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.stale_writes_skipped, 1);
}

#[tokio::test]
async fn deleted_ticket_ends_the_run_quietly() {
    let h = harness(ScriptedReasoning::always_good());
    let (_, event) = ticket_and_event();
    // Never seeded: the persistence step sees NotFound.

    h.service.handle_event(event).await;
    h.service.drain().await;

    let counters = h.service.counters();
    assert_eq!(counters.runs_succeeded, 1);
    assert_eq!(counters.runs_exhausted, 0);
    assert_eq!(counters.stale_writes_skipped, 1);
    assert_eq!(h.mailer.sent_count(), 0);
}

#[tokio::test]
async fn conflicting_event_queues_and_runs_after_the_active_run() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let h = harness(ScriptedReasoning::gated(vec![], Arc::clone(&gate)));
    let (ticket, event) = ticket_and_event();
    let ticket_id = ticket.id;
    h.store.insert(ticket);

    let mut second = event.clone();
    second.idempotency_key = Some("manual-edit-redelivery".into());

    let first_status = h.service.handle_event(event).await;
    assert!(matches!(first_status, IntakeStatus::Started { .. }));

    // Let the first run park inside the reasoning call.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(h.service.handle_event(second).await, IntakeStatus::Queued);

    gate.add_permits(2);
    h.service.drain().await;

    let counters = h.service.counters();
    assert_eq!(counters.runs_admitted, 2);
    assert_eq!(counters.runs_succeeded, 2);
    assert_eq!(counters.events_queued, 1);

    let stored = h.store.get(ticket_id).await.unwrap().unwrap();
    assert_eq!(stored.last_workflow_version, 2);
}

#[tokio::test]
async fn cancellation_is_checked_before_the_next_step() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let h = harness(ScriptedReasoning::gated(vec![], Arc::clone(&gate)));
    let (ticket, event) = ticket_and_event();
    let ticket_id = ticket.id;
    h.store.insert(ticket);

    h.service.handle_event(event).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert!(h.service.cancel(ticket_id));
    gate.add_permits(1);
    h.service.drain().await;

    let counters = h.service.counters();
    assert_eq!(counters.runs_cancelled, 1);
    assert_eq!(counters.runs_succeeded, 0);
    assert_eq!(h.mailer.sent_count(), 0);

    let stored = h.store.get(ticket_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Open, "cancelled run must not write");
}

#[tokio::test]
async fn no_matching_handler_is_a_valid_terminal_assignment() {
    let response = r#"{"summary":"s","priority":"low","relatedSkills":["haskell"]}"#;
    let h = harness(ScriptedReasoning::new(vec![Ok(response.into())]));
    let (ticket, event) = ticket_and_event();
    h.store.insert(ticket.clone());

    h.service.handle_event(event).await;
    h.service.drain().await;

    let stored = h.store.get(ticket.id).await.unwrap().unwrap();
    assert!(stored.assigned_to.is_empty());
    assert_eq!(stored.priority, TicketPriority::Low);
    assert_eq!(h.mailer.sent_count(), 0);
    assert_eq!(h.service.counters().runs_succeeded, 1);
}
