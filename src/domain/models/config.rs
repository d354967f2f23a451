use serde::{Deserialize, Serialize};

/// Main configuration structure for Triago.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Workflow pacing and concurrency limits
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Run registry retention
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Retry policy for transient collaborator failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Reasoning collaborator configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Mail gateway configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            registry: RegistryConfig::default(),
            retry: RetryConfig::default(),
            reasoning: ReasoningConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Workflow pacing and concurrency limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowConfig {
    /// Timeout applied to each external call made by a run, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Maximum in-flight notification sends per run (1-64)
    #[serde(default = "default_max_in_flight_notifications")]
    pub max_in_flight_notifications: usize,
}

const fn default_call_timeout_secs() -> u64 {
    30
}

const fn default_max_in_flight_notifications() -> usize {
    4
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            max_in_flight_notifications: default_max_in_flight_notifications(),
        }
    }
}

/// Run registry retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryConfig {
    /// How long terminal run records are kept for dedup lookups, in seconds.
    /// Must cover the upstream transport's redelivery window.
    #[serde(default = "default_terminal_retention_secs")]
    pub terminal_retention_secs: u64,
}

const fn default_terminal_retention_secs() -> u64 {
    3600
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            terminal_retention_secs: default_terminal_retention_secs(),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum attempts per retriable step (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Reasoning collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReasoningConfig {
    /// API key (can also be set via TRIAGO_REASONING__API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the messages API
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests per second allowed against the reasoning API
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: f64,

    /// Descriptions longer than this are truncated before the call
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
}

fn default_reasoning_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_reasoning_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_reasoning_timeout_secs() -> u64 {
    60
}

const fn default_rate_limit_rps() -> f64 {
    5.0
}

const fn default_max_description_chars() -> usize {
    8000
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_reasoning_base_url(),
            model: default_reasoning_model(),
            timeout_secs: default_reasoning_timeout_secs(),
            rate_limit_rps: default_rate_limit_rps(),
            max_description_chars: default_max_description_chars(),
        }
    }
}

/// Mail gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MailConfig {
    /// Mail gateway endpoint
    #[serde(default = "default_mail_endpoint")]
    pub endpoint: String,

    /// Bearer token for the gateway (can also be set via TRIAGO_MAIL__TOKEN)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// From address stamped on every notification
    #[serde(default = "default_mail_from")]
    pub from: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mail_endpoint() -> String {
    "http://localhost:8025".to_string()
}

fn default_mail_from() -> String {
    "Triago <no-reply@triago.local>".to_string()
}

const fn default_mail_timeout_secs() -> u64 {
    10
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mail_endpoint(),
            token: None,
            from: default_mail_from(),
            timeout_secs: default_mail_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
