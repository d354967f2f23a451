//! Run registry: admission, dedup and per-ticket mutual exclusion.
//!
//! The registry is the source of truth for idempotency. Terminal run records
//! are retained for a bounded window (at least as long as the upstream
//! transport may redeliver) and purged lazily on admission.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::models::{RegistryConfig, RunOutcome, TicketCreated, TriageRun};

/// Result of presenting an event to the registry.
#[derive(Debug)]
pub enum Admission {
    /// A fresh run; the caller is now the ticket's sole authority until the
    /// run is retired. The flag cancels the run cooperatively.
    Admitted {
        run: TriageRun,
        cancel: Arc<AtomicBool>,
    },
    /// A terminal run already exists for this idempotency key; the event has
    /// already been handled and must produce no side effects.
    Duplicate,
    /// A run is currently active for this ticket; the event was queued and
    /// will be re-admitted when the active run retires.
    Queued,
}

/// Terminal record kept for dedup lookups.
#[derive(Debug, Clone)]
pub struct TerminalRun {
    pub run_id: Uuid,
    pub ticket_id: Uuid,
    pub outcome: RunOutcome,
    pub retired_at: DateTime<Utc>,
}

struct ActiveRun {
    run_id: Uuid,
    cancel: Arc<AtomicBool>,
}

#[derive(Default)]
struct Inner {
    active: HashMap<Uuid, ActiveRun>,
    queued: HashMap<Uuid, VecDeque<TicketCreated>>,
    terminal: HashMap<String, TerminalRun>,
    /// Per-ticket monotonic epoch counter; becomes the causal stamp of the
    /// next admitted run.
    epochs: HashMap<Uuid, u64>,
}

/// Process-wide map from ticket ID to run state.
///
/// Mutual exclusion is per ticket ID, not a global lock: many runs execute
/// concurrently, but at most one per ticket.
pub struct RunRegistry {
    inner: Mutex<Inner>,
    retention: Duration,
}

impl RunRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retention: Duration::seconds(config.terminal_retention_secs.min(i64::MAX as u64) as i64),
        }
    }

    /// Admit or reject an event.
    pub fn admit(&self, event: &TicketCreated) -> Admission {
        let key = event.dedup_key();
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        Self::purge_expired(&mut inner, self.retention, Utc::now());

        if inner.terminal.contains_key(&key) {
            return Admission::Duplicate;
        }

        if inner.active.contains_key(&event.ticket_id) {
            inner
                .queued
                .entry(event.ticket_id)
                .or_default()
                .push_back(event.clone());
            return Admission::Queued;
        }

        let epoch = inner
            .epochs
            .entry(event.ticket_id)
            .and_modify(|e| *e += 1)
            .or_insert(1);
        let run = TriageRun::new(event.ticket_id, key, *epoch);
        let cancel = Arc::new(AtomicBool::new(false));
        inner.active.insert(
            event.ticket_id,
            ActiveRun {
                run_id: run.id,
                cancel: Arc::clone(&cancel),
            },
        );
        Admission::Admitted { run, cancel }
    }

    /// Retire a run with its terminal outcome, releasing the ticket.
    pub fn retire(&self, run: &TriageRun, outcome: RunOutcome) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner
            .active
            .get(&run.ticket_id)
            .is_some_and(|active| active.run_id == run.id)
        {
            inner.active.remove(&run.ticket_id);
        }
        inner.terminal.insert(
            run.idempotency_key.clone(),
            TerminalRun {
                run_id: run.id,
                ticket_id: run.ticket_id,
                outcome,
                retired_at: Utc::now(),
            },
        );
    }

    /// Pop the next queued event for a ticket, if any.
    pub fn take_next_queued(&self, ticket_id: Uuid) -> Option<TicketCreated> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let queue = inner.queued.get_mut(&ticket_id)?;
        let next = queue.pop_front();
        if queue.is_empty() {
            inner.queued.remove(&ticket_id);
        }
        next
    }

    /// Request cooperative cancellation of the ticket's active run.
    /// Returns false when no run is active.
    pub fn cancel(&self, ticket_id: Uuid) -> bool {
        let inner = self.inner.lock().expect("registry lock poisoned");
        match inner.active.get(&ticket_id) {
            Some(active) => {
                active.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Terminal record for an idempotency key, if still retained.
    pub fn lookup(&self, idempotency_key: &str) -> Option<TerminalRun> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.terminal.get(idempotency_key).cloned()
    }

    /// Purge expired terminal records; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        Self::purge_expired(&mut inner, self.retention, Utc::now())
    }

    pub fn active_count(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.active.len()
    }

    fn purge_expired(inner: &mut Inner, retention: Duration, now: DateTime<Utc>) -> usize {
        let before = inner.terminal.len();
        inner
            .terminal
            .retain(|_, record| record.retired_at + retention > now);
        before - inner.terminal.len()
    }
}
