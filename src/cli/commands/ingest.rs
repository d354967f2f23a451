//! `triago ingest` — feed `ticket.created` events through the workflow.
//!
//! Stands in for the excluded HTTP API: reads newline-delimited JSON event
//! envelopes from a file or stdin, admits each through the triage service,
//! then drains and reports the run counters.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::models::{Config, EventEnvelope, Handler, Ticket, TICKET_CREATED};
use crate::infrastructure::mail::{HttpMailGateway, MailGatewayConfig};
use crate::infrastructure::memory::{InMemoryHandlerDirectory, InMemoryTicketStore};
use crate::infrastructure::reasoning::{HttpReasoningClient, ReasoningClientConfig};
use crate::services::TriageService;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Event file (newline-delimited JSON envelopes); stdin when omitted
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// YAML file with the candidate handler pool
    #[arg(long, value_name = "PATH")]
    pub handlers: Option<PathBuf>,
}

pub async fn execute(args: &IngestArgs, config: Config, json: bool) -> Result<()> {
    let reasoning = Arc::new(HttpReasoningClient::new(ReasoningClientConfig::from_config(
        &config.reasoning,
    )?)?);
    let mailer = Arc::new(HttpMailGateway::new(MailGatewayConfig::from_config(
        &config.mail,
    ))?);
    let store = Arc::new(InMemoryTicketStore::new());
    let store_port: Arc<dyn crate::domain::ports::TicketStore> = store.clone();
    let directory = Arc::new(InMemoryHandlerDirectory::new(load_handlers(args)?));

    let service = TriageService::new(&config, reasoning, mailer, store_port, directory);

    let reader: Box<dyn BufRead> = match &args.file {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    let mut accepted = 0_u64;
    let mut skipped = 0_u64;
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read event line")?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope: EventEnvelope = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event envelope on line {}", number + 1))?;
        if envelope.name != TICKET_CREATED {
            tracing::warn!(name = %envelope.name, "Skipping unsupported event");
            skipped += 1;
            continue;
        }

        seed_ticket(&store, &envelope).await;
        service.handle_event(envelope.data).await;
        accepted += 1;
    }

    service.drain().await;

    let counters = service.counters();
    if json {
        let summary = serde_json::json!({
            "accepted": accepted,
            "skipped": skipped,
            "counters": counters,
        });
        println!("{summary}");
    } else {
        println!("Accepted {accepted} event(s), skipped {skipped}.");
        println!(
            "Runs: {} succeeded, {} exhausted, {} cancelled ({} duplicate deliveries).",
            counters.runs_succeeded,
            counters.runs_exhausted,
            counters.runs_cancelled,
            counters.events_duplicate,
        );
        println!(
            "Notifications: {} sent, {} failed. Classification fallbacks: {}.",
            counters.notifications_sent,
            counters.notifications_failed,
            counters.classification_fallbacks,
        );
    }
    Ok(())
}

/// Materialize the ticket record the event describes, if we have not seen it
/// yet. The real deployment reads tickets from the API layer's store.
async fn seed_ticket(store: &InMemoryTicketStore, envelope: &EventEnvelope) {
    use crate::domain::ports::TicketStore as _;
    let event = &envelope.data;
    if store.get(event.ticket_id).await.ok().flatten().is_none() {
        let mut ticket = Ticket::new(
            event.title.clone(),
            event.description.clone(),
            event.created_by,
        );
        ticket.id = event.ticket_id;
        store.insert(ticket);
    }
}

fn load_handlers(args: &IngestArgs) -> Result<Vec<Handler>> {
    let Some(path) = &args.handlers else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let handlers: Vec<Handler> =
        serde_yaml::from_str(&raw).context("Handler pool file is not a YAML list of handlers")?;
    Ok(handlers)
}
