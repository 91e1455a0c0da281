//! Transport that logs messages instead of delivering them.

use async_trait::async_trait;

use super::{MailError, MailTransport, OutgoingMail};

/// Development transport: every send succeeds and is logged.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl MailTransport for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn verify(&self) -> Result<(), MailError> {
        tracing::warn!(from = %self.from, "log mail transport in use; reminders are not delivered");
        Ok(())
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            "reminder email (not delivered)"
        );
        Ok(())
    }
}
