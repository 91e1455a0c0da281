//! Explicit, configurable engine policies.
//!
//! Each policy names a behavior that was previously implicit so it can be
//! tested and changed on purpose. Defaults preserve the long-standing
//! clinic behavior.

use serde::{Deserialize, Serialize};

use crate::models::{SendStatus, SentRecord};

/// Does a failed attempt count as "already notified"?
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailedAttemptPolicy {
    /// A failed send blocks the exact-age rule and anchors recurrence.
    #[default]
    BlockRetry,
    /// Only successful sends count; failed reminders are retried next cycle.
    AllowRetry,
}

impl FailedAttemptPolicy {
    /// Whether a record counts as a notification under this policy.
    pub fn counts(&self, record: &SentRecord) -> bool {
        match self {
            FailedAttemptPolicy::BlockRetry => true,
            FailedAttemptPolicy::AllowRetry => record.status == SendStatus::Sent,
        }
    }
}

/// What "last notified" refers to for recurring templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrenceAnchor {
    /// The pet's most recent record for any template in the cycle's set,
    /// so an exact-age template can start a recurring chain.
    #[default]
    AnyTemplate,
    /// Only earlier records of the recurring template itself.
    SameTemplate,
}

/// How many reminders a pet may receive in one age-condition cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Dispatch the first due template in ascending ID order, then move on.
    #[default]
    FirstMatchPerPet,
    /// Dispatch every due template.
    AllDue,
}

/// The policy set used by the evaluator and cycle runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationPolicy {
    pub failed_attempts: FailedAttemptPolicy,
    pub recurrence_anchor: RecurrenceAnchor,
    pub dispatch: DispatchPolicy,
}
