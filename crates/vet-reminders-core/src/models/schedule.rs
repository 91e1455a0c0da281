//! Event-triggered reminder models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A precomputed future reminder awaiting promotion by the daily pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSchedule {
    pub id: i64,
    pub pet_id: i64,
    pub template_id: i64,
    /// Reference to the event that created this row
    pub source_event: String,
    pub scheduled_date: NaiveDate,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: String,
}

/// A pending schedule about to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPendingSchedule {
    pub pet_id: i64,
    pub template_id: i64,
    pub source_event: String,
    pub scheduled_date: NaiveDate,
}

/// A vaccination was recorded for a pet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccinationEvent {
    /// Stable reference of the vaccination record; generated when the caller has none
    #[serde(default = "new_event_ref")]
    pub event_ref: String,
    pub pet_id: i64,
    pub vaccine: String,
    pub event_date: NaiveDate,
}

fn new_event_ref() -> String {
    format!("vaccination-{}", uuid::Uuid::new_v4())
}

impl VaccinationEvent {
    pub fn new(pet_id: i64, vaccine: impl Into<String>, event_date: NaiveDate) -> Self {
        Self {
            event_ref: new_event_ref(),
            pet_id,
            vaccine: vaccine.into(),
            event_date,
        }
    }
}
