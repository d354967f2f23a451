//! HTTP client for the reasoning collaborator's messages API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::models::ReasoningConfig;
use crate::domain::ports::{ReasoningError, ReasoningService};

use super::rate_limiter::TokenBucketRateLimiter;

const API_VERSION: &str = "2023-06-01";
const MAX_COMPLETION_TOKENS: u32 = 1024;
const SYSTEM_PROMPT: &str =
    "You are an expert triage assistant that processes support tickets. Respond ONLY in JSON.";

/// Configuration for the reasoning HTTP client.
#[derive(Debug, Clone)]
pub struct ReasoningClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub rate_limit_rps: f64,
}

impl ReasoningClientConfig {
    pub fn from_config(config: &ReasoningConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("TRIAGO_REASONING__API_KEY").ok())
            .context("Reasoning API key is not configured")?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            rate_limit_rps: config.rate_limit_rps,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Production client for the reasoning collaborator.
///
/// Connection pooling via the shared reqwest client, a token bucket to stay
/// inside the provider's rate limits, a hard request timeout and typed
/// status-code classification. Retry is the step executor's job, not this
/// client's: it reports transient vs permanent and nothing more.
pub struct HttpReasoningClient {
    http_client: ReqwestClient,
    config: ReasoningClientConfig,
    rate_limiter: TokenBucketRateLimiter,
}

impl HttpReasoningClient {
    pub fn new(config: ReasoningClientConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build HTTP client")?;

        let rate_limiter = TokenBucketRateLimiter::new(config.rate_limit_rps);
        Ok(Self {
            http_client,
            config,
            rate_limiter,
        })
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        self.rate_limiter.acquire().await;

        let request = MessageRequest {
            model: &self.config.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(error_from_status(status, body));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|err| ReasoningError::Unknown(format!("unparseable response body: {err}")))?;

        let text = message
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> ReasoningError {
    if err.is_timeout() {
        ReasoningError::Timeout
    } else {
        ReasoningError::Network(err.to_string())
    }
}

/// Map HTTP status codes to error variants:
/// 400 invalid request, 401/403 auth, 429 rate limited, 5xx server,
/// 529 overloaded, anything else unknown.
fn error_from_status(status: StatusCode, body: String) -> ReasoningError {
    match status.as_u16() {
        400 => ReasoningError::InvalidRequest(body),
        401 | 403 => ReasoningError::AuthenticationFailed(body),
        429 => ReasoningError::RateLimited,
        529 => ReasoningError::Overloaded,
        code if (500..600).contains(&code) => ReasoningError::ServerError(body),
        _ => ReasoningError::Unknown(format!("HTTP {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_status_mapping() {
        assert!(matches!(
            error_from_status(StatusCode::BAD_REQUEST, "bad".into()),
            ReasoningError::InvalidRequest(_)
        ));
        assert!(matches!(
            error_from_status(StatusCode::UNAUTHORIZED, "key".into()),
            ReasoningError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            error_from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ReasoningError::RateLimited
        ));
        assert!(matches!(
            error_from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            ReasoningError::ServerError(_)
        ));
        assert!(matches!(
            error_from_status(StatusCode::from_u16(529).unwrap(), String::new()),
            ReasoningError::Overloaded
        ));
        assert!(matches!(
            error_from_status(StatusCode::IM_A_TEAPOT, String::new()),
            ReasoningError::Unknown(_)
        ));
    }

    #[test]
    fn test_transient_statuses_are_retriable() {
        assert!(error_from_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_transient());
        assert!(error_from_status(StatusCode::BAD_GATEWAY, String::new()).is_transient());
        assert!(!error_from_status(StatusCode::FORBIDDEN, String::new()).is_transient());
    }
}
