//! Condition evaluation for age-triggered templates.
//!
//! Pure functions over a pet's age and its history. Nothing here touches
//! storage or the clock; the cycle runner passes `now` in.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::policy::{EvaluationPolicy, RecurrenceAnchor};
use crate::models::{AgeCondition, SentRecord, Template};

/// A template that should be dispatched for a pet now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueReminder {
    pub template_id: i64,
    pub age_weeks: i64,
    /// Most recent notification counted by the policy
    pub last_sent: Option<DateTime<Utc>>,
    /// When the next recurrence falls due, for recurring templates
    pub next_due: Option<NaiveDate>,
}

/// Why a template is not due.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NotDueReason {
    AgeMismatch { age_weeks: i64, expected: u32 },
    AlreadyAttempted,
    /// Recurring template with nothing to recur from.
    NoPriorNotification,
    IntervalNotElapsed { due_at: DateTime<Utc> },
    /// The interval lands past the representable calendar.
    IntervalOutOfRange { weeks: u32 },
    /// Event templates are handled by the pre-scheduler.
    EventTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Evaluation {
    Due(DueReminder),
    NotDue(NotDueReason),
}

impl Evaluation {
    pub fn is_due(&self) -> bool {
        matches!(self, Evaluation::Due(_))
    }
}

/// Decide whether `template` is due for a pet.
///
/// `history` is the pet's records, newest first. It may include records for
/// other templates; the policy decides which of them matter.
pub fn evaluate(
    template: &Template,
    age_weeks: i64,
    history: &[SentRecord],
    policy: &EvaluationPolicy,
    now: DateTime<Utc>,
) -> Evaluation {
    let Some(condition) = template.age_condition() else {
        return Evaluation::NotDue(NotDueReason::EventTemplate);
    };

    match condition {
        AgeCondition::ExactWeeks(expected) => {
            if age_weeks != i64::from(expected) {
                return Evaluation::NotDue(NotDueReason::AgeMismatch {
                    age_weeks,
                    expected,
                });
            }
            if counted(history, policy).any(|r| r.template_id == template.id) {
                return Evaluation::NotDue(NotDueReason::AlreadyAttempted);
            }
            Evaluation::Due(DueReminder {
                template_id: template.id,
                age_weeks,
                last_sent: counted(history, policy).next().map(|r| r.sent_at),
                next_due: None,
            })
        }
        AgeCondition::SinceLastSent { weeks } => {
            let anchor = counted(history, policy).find(|r| match policy.recurrence_anchor {
                RecurrenceAnchor::AnyTemplate => true,
                RecurrenceAnchor::SameTemplate => r.template_id == template.id,
            });
            let Some(anchor) = anchor else {
                return Evaluation::NotDue(NotDueReason::NoPriorNotification);
            };

            let out_of_range = Evaluation::NotDue(NotDueReason::IntervalOutOfRange { weeks });
            let Some(interval) = Duration::try_weeks(i64::from(weeks)) else {
                return out_of_range;
            };
            let Some(due_at) = anchor.sent_at.checked_add_signed(interval) else {
                return out_of_range;
            };
            if now < due_at {
                return Evaluation::NotDue(NotDueReason::IntervalNotElapsed { due_at });
            }

            Evaluation::Due(DueReminder {
                template_id: template.id,
                age_weeks,
                last_sent: Some(anchor.sent_at),
                next_due: now.checked_add_signed(interval).map(|at| at.date_naive()),
            })
        }
    }
}

/// Records that count as notifications under the failed-attempt policy.
fn counted<'a>(
    history: &'a [SentRecord],
    policy: &'a EvaluationPolicy,
) -> impl Iterator<Item = &'a SentRecord> + 'a {
    history
        .iter()
        .filter(move |r| policy.failed_attempts.counts(r))
}
