//! Notification fan-out: per-recipient sends with bounded concurrency,
//! per-recipient retry and per-run dedup.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::domain::models::Handler;
use crate::domain::ports::{MailError, Mailer};
use crate::services::backoff::BackoffPolicy;

/// What happened to each recipient of one run.
#[derive(Debug, Default)]
pub struct NotificationReport {
    pub sent: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
    /// Recipients skipped because the (run, handler) pair already notified.
    pub deduped: usize,
}

/// Fans one run's notifications out to its selected handlers.
///
/// All recipient tasks are joined before the caller proceeds; a failed
/// recipient never fails the run. The original fire-and-forget sends were
/// re-architected into this joined, bounded pool.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    backoff: BackoffPolicy,
    max_in_flight: usize,
    call_timeout: Duration,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        backoff: BackoffPolicy,
        max_in_flight: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            backoff,
            max_in_flight: max_in_flight.max(1),
            call_timeout,
        }
    }

    /// Notify every handler not already covered by the run's sent-set.
    ///
    /// A (run, handler) pair is marked attempted up front, so a re-entered
    /// Notifying step cannot double-send — at-most-once per pair.
    pub async fn fan_out(
        &self,
        run_id: Uuid,
        recipients: &[Handler],
        subject: &str,
        body: &str,
        sent_set: &mut HashSet<Uuid>,
    ) -> NotificationReport {
        let mut report = NotificationReport::default();

        let targets: Vec<(Uuid, String)> = recipients
            .iter()
            .filter_map(|handler| {
                let fresh = sent_set.insert(handler.id);
                if !fresh {
                    report.deduped += 1;
                    None
                } else {
                    Some((handler.id, handler.email.clone()))
                }
            })
            .collect();

        let results: Vec<(Uuid, Result<(), String>)> = stream::iter(targets)
            .map(|(handler_id, email)| {
                async move {
                    let result = self.send_with_retry(run_id, &email, subject, body).await;
                    (handler_id, result)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        for (handler_id, result) in results {
            match result {
                Ok(()) => report.sent.push(handler_id),
                Err(reason) => report.failed.push((handler_id, reason)),
            }
        }
        report
    }

    async fn send_with_retry(
        &self,
        run_id: Uuid,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), String> {
        let max = self.backoff.max_attempts();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match tokio::time::timeout(
                self.call_timeout,
                self.mailer.send(to, subject, body),
            )
            .await
            {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => err,
                Err(_) => MailError::Timeout,
            };

            if !error.is_transient() || attempt >= max {
                return Err(error.to_string());
            }

            let delay = self.backoff.delay_for(run_id, attempt - 1);
            tracing::warn!(
                run_id = %run_id,
                to,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Notification attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
