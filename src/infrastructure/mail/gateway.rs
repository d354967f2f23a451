//! HTTP mail gateway client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Serialize;

use crate::domain::models::MailConfig;
use crate::domain::ports::{MailError, Mailer};

/// Configuration for the mail gateway client.
#[derive(Debug, Clone)]
pub struct MailGatewayConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub from: String,
    pub timeout_secs: u64,
}

impl MailGatewayConfig {
    pub fn from_config(config: &MailConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            token: config
                .token
                .clone()
                .or_else(|| std::env::var("TRIAGO_MAIL__TOKEN").ok()),
            from: config.from.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Client for an HTTP mail gateway (`POST {endpoint}/messages`).
///
/// Maps gateway responses to the typed failure taxonomy: 429 is a quota
/// failure, other 4xx reject the message, 5xx and transport errors are
/// network failures.
pub struct HttpMailGateway {
    http_client: ReqwestClient,
    config: MailGatewayConfig,
}

impl HttpMailGateway {
    pub fn new(config: MailGatewayConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let request = SendRequest {
            from: &self.config.from,
            to,
            subject,
            text: body,
        };

        let mut builder = self
            .http_client
            .post(format!("{}/messages", self.config.endpoint))
            .json(&request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                MailError::Timeout
            } else {
                MailError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error response".to_string());
        Err(error_from_status(status, detail))
    }
}

fn error_from_status(status: StatusCode, detail: String) -> MailError {
    match status.as_u16() {
        429 => MailError::Quota,
        code if (400..500).contains(&code) => MailError::Rejected(detail),
        _ => MailError::Network(format!("HTTP {status}: {detail}")),
    }
}
