//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use triago::domain::models::{
    Config, Handler, HandlerRole, RetryConfig, Ticket, TicketCreated,
};
use triago::domain::ports::{MailError, Mailer, ReasoningError, ReasoningService};

/// A classification response that selects the networking handler.
pub fn good_response() -> String {
    r#"{"summary":"VPN drops every ten minutes","priority":"high","helpfulNotes":"check MTU and keepalive","relatedSkills":["networking"]}"#
        .to_string()
}

/// Config with fast backoff so retry paths finish in milliseconds.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.retry = RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    };
    config.workflow.call_timeout_secs = 5;
    config
}

/// Reasoning double that replays a script of responses, then repeats the
/// last entry (or the good response when the script is empty).
pub struct ScriptedReasoning {
    script: Mutex<VecDeque<Result<String, ReasoningError>>>,
    calls: AtomicU32,
    /// When set, every call waits for a permit before answering.
    gate: Option<Arc<tokio::sync::Semaphore>>,
}

impl ScriptedReasoning {
    pub fn new(script: Vec<Result<String, ReasoningError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
            gate: None,
        }
    }

    pub fn always_good() -> Self {
        Self::new(vec![])
    }

    pub fn gated(script: Vec<Result<String, ReasoningError>>, gate: Arc<tokio::sync::Semaphore>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
            gate: Some(gate),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(&self, _prompt: &str) -> Result<String, ReasoningError> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.pop_front().unwrap_or_else(|| Ok(good_response()))
    }
}

/// Mailer double that records sends and rejects configured addresses.
pub struct RecordingMailer {
    pub sends: Mutex<Vec<(String, String, String)>>,
    reject: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            reject: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject_address(&self, address: &str) {
        self.reject.lock().unwrap().insert(address.to_string());
    }

    pub fn sent_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(to, _, _)| to.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.reject.lock().unwrap().contains(to) {
            return Err(MailError::Rejected(to.to_string()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Moderator pool: m1 knows networking (capitalized), m2 knows python.
pub fn moderator_pool() -> Vec<Handler> {
    vec![
        Handler::new(
            "m1@example.com",
            vec!["Networking".into(), "Go".into()],
            HandlerRole::Moderator,
        ),
        Handler::new("m2@example.com", vec!["python".into()], HandlerRole::Moderator),
    ]
}

/// A seeded ticket plus the matching ticket.created event.
pub fn ticket_and_event() -> (Ticket, TicketCreated) {
    let created_by = Uuid::new_v4();
    let ticket = Ticket::new("VPN drops", "Drops every ten minutes", created_by);
    let event = TicketCreated {
        ticket_id: ticket.id,
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        created_by,
        idempotency_key: None,
    };
    (ticket, event)
}
