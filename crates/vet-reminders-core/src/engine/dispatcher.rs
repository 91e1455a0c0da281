//! Render, send, and record one reminder.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::policy::FailedAttemptPolicy;
use super::render::{render_mail, ReminderContext};
use crate::mail::{MailError, MailTransport};
use crate::models::{NewSentRecord, RecordOrigin, RecordOutcome, SendStatus, SentRecord, Template};
use crate::store::ReminderStore;

/// Default bound on a single transport send.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One reminder to deliver.
#[derive(Debug, Clone)]
pub struct DispatchRequest<'a> {
    pub pet_id: i64,
    pub owner_id: i64,
    pub email: &'a str,
    pub template: &'a Template,
    pub context: ReminderContext,
    pub origin: RecordOrigin,
}

/// Result of a dispatch. Send failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Sent(SentRecord),
    Failed(SentRecord),
    /// Another run already recorded this exact-age reminder.
    Duplicate,
    /// The attempt happened but could not be persisted.
    NotRecorded { delivered: bool, error: String },
}

impl DispatchOutcome {
    pub fn delivered(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Sent(_) | DispatchOutcome::NotRecorded { delivered: true, .. }
        )
    }

    /// The persisted record, when one was written.
    pub fn record(&self) -> Option<&SentRecord> {
        match self {
            DispatchOutcome::Sent(r) | DispatchOutcome::Failed(r) => Some(r),
            _ => None,
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn ReminderStore>,
    transport: Arc<dyn MailTransport>,
    timeout: Duration,
    failed_attempts: FailedAttemptPolicy,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        transport: Arc<dyn MailTransport>,
        timeout: Duration,
        failed_attempts: FailedAttemptPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            timeout,
            failed_attempts,
        }
    }

    /// Deliver one reminder and write exactly one record of the attempt.
    pub async fn dispatch(&self, request: DispatchRequest<'_>) -> DispatchOutcome {
        let template = request.template;
        let exact_age = request.origin == RecordOrigin::Cycle && template.is_exact_age();

        if exact_age && self.already_recorded(request.pet_id, template.id) {
            debug!(
                pet_id = request.pet_id,
                template_id = template.id,
                "exact-age reminder recorded by another run, skipping"
            );
            return DispatchOutcome::Duplicate;
        }

        let mail = render_mail(template, &request.context, request.email);
        let result = match tokio::time::timeout(self.timeout, self.transport.send(&mail)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(self.timeout)),
        };

        let (status, error_text) = match &result {
            Ok(()) => (SendStatus::Sent, None),
            Err(e) => {
                warn!(
                    pet_id = request.pet_id,
                    template_id = template.id,
                    error = %e,
                    "reminder send failed"
                );
                (SendStatus::Failed, Some(e.to_string()))
            }
        };

        let record = NewSentRecord {
            pet_id: request.pet_id,
            template_id: template.id,
            owner_id: request.owner_id,
            sent_at: Utc::now(),
            status,
            error: error_text,
            origin: request.origin,
            exact_age,
        };

        match self.store.record(&record) {
            Ok(RecordOutcome::Recorded(saved)) if saved.succeeded() => {
                info!(
                    pet_id = saved.pet_id,
                    template_id = saved.template_id,
                    origin = saved.origin.as_str(),
                    "reminder sent"
                );
                DispatchOutcome::Sent(saved)
            }
            Ok(RecordOutcome::Recorded(saved)) => DispatchOutcome::Failed(saved),
            Ok(RecordOutcome::Duplicate) => {
                warn!(
                    pet_id = request.pet_id,
                    template_id = template.id,
                    "exact-age reminder already recorded, delivery was a duplicate"
                );
                DispatchOutcome::Duplicate
            }
            Err(e) => {
                error!(
                    pet_id = request.pet_id,
                    template_id = template.id,
                    error = %e,
                    "failed to record reminder attempt"
                );
                DispatchOutcome::NotRecorded {
                    delivered: result.is_ok(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Storage check right before sending, narrowing the window between
    /// overlapping runs. Read errors fall through to the send.
    fn already_recorded(&self, pet_id: i64, template_id: i64) -> bool {
        if self.failed_attempts == FailedAttemptPolicy::AllowRetry {
            return false;
        }
        match self.store.has_attempted(pet_id, template_id) {
            Ok(attempted) => attempted,
            Err(e) => {
                warn!(pet_id, template_id, error = %e, "attempt check failed");
                false
            }
        }
    }
}
