//! Vet Reminders Core Library
//!
//! Recurring health-reminder engine for pet clinics: decides which owners
//! receive which reminder, when, and makes sure each reminder is sent once.
//!
//! # Architecture
//!
//! ```text
//!   cron job / HTTP request                 vaccination recorded
//!             │                                      │
//!             ▼                                      ▼
//!      ReminderService ── run-lock ──┐         PreScheduler
//!             │                      │        (pending rows)
//!             ▼                      │               │
//!        CycleRunner                 │               ▼
//!   load templates, pets,            └──────▶ pending pass
//!   owners, history once                             │
//!             │                                      │
//!             ▼                                      │
//!   evaluate(age, history) ──due──▶ Dispatcher ◀─────┘
//!                                       │
//!                         render → send (timeout) → record
//!                                       │
//!                             ┌─────────▼─────────┐
//!                             │   sent_records    │
//!                             │   (append-only)   │
//!                             └───────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Every dispatch attempt writes exactly one record**, successful or not.
//! History is the sole source of truth for "already notified".
//!
//! # Modules
//!
//! - [`db`]: SQLite storage for pets, templates, history and pending schedules
//! - [`models`]: Domain types (Pet, Template, SentRecord, PendingSchedule, etc.)
//! - [`store`]: Repository traits the engine depends on
//! - [`mail`]: Outbound mail transports
//! - [`engine`]: Evaluation, dispatch, cycles and triggers

pub mod db;
pub mod engine;
pub mod mail;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use db::{Database, DbError, DbResult};
pub use engine::{
    CycleSummary, EngineError, EngineResult, EngineScope, EvaluationPolicy, PendingPassSummary,
    ReminderService, ReminderSettings, TriggerSource,
};
pub use mail::{build_transport, MailError, MailSettings, MailTransport};
pub use models::{
    AgeCondition, Owner, PendingSchedule, Pet, SendStatus, SentRecord, Template, TemplatePatch,
    TemplateTrigger, VaccinationEvent,
};
pub use store::{ReminderStore, SharedDatabase};
