//! HTTP adapter for the mail collaborator.

pub mod gateway;

pub use gateway::{HttpMailGateway, MailGatewayConfig};
