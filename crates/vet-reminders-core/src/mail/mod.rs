//! Outbound email transport.
//!
//! The transport is built once per process from [`MailSettings`], verified
//! at startup, and injected into the dispatcher.

mod fake;
mod http;
mod logger;

pub use fake::FakeMailer;
pub use http::HttpMailer;
pub use logger::LogMailer;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the mail transport.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail configuration error: {0}")]
    Config(String),

    #[error("Mail relay unreachable: {0}")]
    Unreachable(String),

    #[error("Mail relay rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail send timed out after {0:?}")]
    Timeout(Duration),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Email sending collaborator.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Check that the transport can deliver. Called once at startup.
    async fn verify(&self) -> Result<(), MailError>;

    /// Deliver one message.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;

    /// Release resources before the process exits.
    async fn shutdown(&self) {}
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MailSettings {
    /// JSON mail relay reached over HTTP.
    Http {
        endpoint: String,
        api_key: Option<String>,
        from: String,
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
    },
    /// Log messages instead of sending them (development).
    Log { from: String },
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings::Log {
            from: "reminders@localhost".to_string(),
        }
    }
}

/// Build the configured transport.
pub fn build_transport(settings: &MailSettings) -> Result<Arc<dyn MailTransport>, MailError> {
    match settings {
        MailSettings::Http {
            endpoint,
            api_key,
            from,
            request_timeout_secs,
        } => Ok(Arc::new(HttpMailer::new(
            endpoint,
            api_key.clone(),
            from,
            Duration::from_secs(*request_timeout_secs),
        )?)),
        MailSettings::Log { from } => Ok(Arc::new(LogMailer::new(from))),
    }
}
