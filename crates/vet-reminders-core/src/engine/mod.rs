//! The reminder engine.
//!
//! Two reminder styles share one dispatcher:
//!
//! - **Age-condition cycles** ([`CycleRunner`]): periodic passes over every pet
//!   of a species, evaluating age-triggered templates against history.
//! - **Pre-scheduled reminders** ([`PreScheduler`]): a qualifying event writes
//!   pending rows up front; a daily pass promotes the due ones.
//!
//! [`ReminderService`] is the single entry point used by the cron scheduler
//! and HTTP handlers.

pub mod age;
pub mod cycle;
pub mod dispatcher;
pub mod evaluator;
pub mod history;
pub mod policy;
pub mod prescheduler;
pub mod render;
pub mod trigger;

pub use age::{age_in_weeks, age_in_weeks_on};
pub use cycle::{CycleRunner, CycleSummary, EngineScope};
pub use dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher, DEFAULT_DISPATCH_TIMEOUT};
pub use evaluator::{evaluate, DueReminder, Evaluation, NotDueReason};
pub use history::HistoryIndex;
pub use policy::{DispatchPolicy, EvaluationPolicy, FailedAttemptPolicy, RecurrenceAnchor};
pub use prescheduler::{PendingPassSummary, PreScheduler};
pub use render::{render, ReminderContext};
pub use trigger::{EngineFailure, ReminderService, ReminderSettings, RunAllSummary, TriggerSource};

use thiserror::Error;

use crate::db::DbError;
use crate::mail::MailError;

/// Errors surfaced to callers of the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Store(#[from] DbError),

    #[error("Mail transport has not been verified; refusing to run")]
    TransportNotReady,

    #[error("Mail transport error: {0}")]
    Mail(#[from] MailError),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Pet not found: {0}")]
    PetNotFound(i64),

    #[error("Template not found: {0}")]
    TemplateNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
