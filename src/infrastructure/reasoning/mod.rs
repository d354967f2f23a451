//! HTTP adapter for the reasoning collaborator.

pub mod client;
pub mod rate_limiter;

pub use client::{HttpReasoningClient, ReasoningClientConfig};
pub use rate_limiter::TokenBucketRateLimiter;
