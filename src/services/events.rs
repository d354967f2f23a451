//! Workflow event stream and monitoring counters.
//!
//! A broadcast bus with monotonic sequence numbers carries structured
//! workflow events to observability consumers. Counters aggregate the same
//! signals for cheap polling.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::RunStep;

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Payload of a workflow event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TriageEventPayload {
    RunAdmitted {
        run_id: Uuid,
        ticket_id: Uuid,
    },
    EventDuplicate {
        ticket_id: Uuid,
        idempotency_key: String,
    },
    EventQueued {
        ticket_id: Uuid,
    },
    StepRetrying {
        run_id: Uuid,
        step: RunStep,
        attempt: u32,
        delay_ms: u64,
    },
    StepExhausted {
        run_id: Uuid,
        step: RunStep,
        attempts: u32,
    },
    ClassificationDefaulted {
        run_id: Uuid,
        reason: String,
    },
    HandlersSelected {
        run_id: Uuid,
        count: usize,
    },
    StaleWriteSkipped {
        run_id: Uuid,
        ticket_id: Uuid,
    },
    NotificationSent {
        run_id: Uuid,
        handler_id: Uuid,
    },
    NotificationFailed {
        run_id: Uuid,
        handler_id: Uuid,
        reason: String,
    },
    RunSucceeded {
        run_id: Uuid,
        ticket_id: Uuid,
        notified: usize,
        notify_failed: usize,
    },
    RunExhausted {
        run_id: Uuid,
        ticket_id: Uuid,
        step: RunStep,
    },
    RunCancelled {
        run_id: Uuid,
        ticket_id: Uuid,
    },
}

impl TriageEventPayload {
    fn severity(&self) -> EventSeverity {
        match self {
            Self::RunAdmitted { .. }
            | Self::HandlersSelected { .. }
            | Self::NotificationSent { .. }
            | Self::RunSucceeded { .. } => EventSeverity::Info,
            Self::EventDuplicate { .. } | Self::EventQueued { .. } => EventSeverity::Debug,
            Self::StepRetrying { .. }
            | Self::ClassificationDefaulted { .. }
            | Self::StaleWriteSkipped { .. }
            | Self::RunCancelled { .. } => EventSeverity::Warning,
            Self::StepExhausted { .. }
            | Self::NotificationFailed { .. }
            | Self::RunExhausted { .. } => EventSeverity::Error,
        }
    }
}

/// Event envelope with bus-assigned sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageEvent {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub severity: EventSeverity,
    pub payload: TriageEventPayload,
}

/// Broadcast bus for workflow events.
pub struct EventBus {
    sender: broadcast::Sender<TriageEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish a payload; sequence and timestamp are assigned here.
    /// Send errors are ignored — there may be no subscribers.
    pub fn publish(&self, payload: TriageEventPayload) {
        let event = TriageEvent {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            severity: payload.severity(),
            payload,
        };
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Monitoring counters for the workflow.
///
/// User-visible failure behavior is limited to tickets staying partially
/// unclassified or unassigned; these counters are how that surfaces.
#[derive(Debug, Default)]
pub struct WorkflowCounters {
    pub runs_admitted: AtomicU64,
    pub runs_succeeded: AtomicU64,
    pub runs_exhausted: AtomicU64,
    pub runs_cancelled: AtomicU64,
    pub events_duplicate: AtomicU64,
    pub events_queued: AtomicU64,
    pub classification_fallbacks: AtomicU64,
    pub stale_writes_skipped: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,
}

/// Point-in-time view of [`WorkflowCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub runs_admitted: u64,
    pub runs_succeeded: u64,
    pub runs_exhausted: u64,
    pub runs_cancelled: u64,
    pub events_duplicate: u64,
    pub events_queued: u64,
    pub classification_fallbacks: u64,
    pub stale_writes_skipped: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}

impl WorkflowCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            runs_admitted: self.runs_admitted.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_exhausted: self.runs_exhausted.load(Ordering::Relaxed),
            runs_cancelled: self.runs_cancelled.load(Ordering::Relaxed),
            events_duplicate: self.events_duplicate.load(Ordering::Relaxed),
            events_queued: self.events_queued.load(Ordering::Relaxed),
            classification_fallbacks: self.classification_fallbacks.load(Ordering::Relaxed),
            stale_writes_skipped: self.stale_writes_skipped.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_sequence_assignment() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let ticket_id = Uuid::new_v4();
        bus.publish(TriageEventPayload::EventQueued { ticket_id });
        bus.publish(TriageEventPayload::EventQueued { ticket_id });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
    }

    #[tokio::test]
    async fn test_severity_mapping() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(TriageEventPayload::NotificationFailed {
            run_id: Uuid::new_v4(),
            handler_id: Uuid::new_v4(),
            reason: "quota".into(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.severity, EventSeverity::Error);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(TriageEventPayload::EventQueued {
            ticket_id: Uuid::new_v4(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = WorkflowCounters::default();
        WorkflowCounters::incr(&counters.runs_admitted);
        WorkflowCounters::add(&counters.notifications_sent, 3);
        let snap = counters.snapshot();
        assert_eq!(snap.runs_admitted, 1);
        assert_eq!(snap.notifications_sent, 3);
        assert_eq!(snap.runs_exhausted, 0);
    }
}
