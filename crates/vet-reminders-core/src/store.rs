//! Repository interfaces the engine reads and writes through.
//!
//! [`SharedDatabase`] implements all of them over SQLite. Each call takes the
//! connection lock briefly, so no lock is ever held across a mail send.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::{Database, DbError, DbResult};
use crate::models::{
    NewPendingSchedule, NewSentRecord, Owner, PendingSchedule, Pet, RecordOutcome, SentRecord,
    Template, TemplatePatch,
};

/// Read access to the clinic's pet registry.
pub trait PetRegistry: Send + Sync {
    /// Pets of a species with a known date of birth, ordered by ID.
    fn pets_with_dob(&self, species: &str) -> DbResult<Vec<Pet>>;
    fn pet(&self, pet_id: i64) -> DbResult<Option<Pet>>;
    fn owner(&self, owner_id: i64) -> DbResult<Option<Owner>>;
    fn owners(&self) -> DbResult<Vec<Owner>>;
}

/// Read-mostly provider of reminder templates.
pub trait TemplateStore: Send + Sync {
    /// Active age-triggered templates for the scope, ascending ID.
    fn active_age_templates(&self, species: &str, category: &str) -> DbResult<Vec<Template>>;
    /// Active event-triggered templates applying to a species, ascending ID.
    fn active_event_templates(&self, species: &str) -> DbResult<Vec<Template>>;
    fn template(&self, id: i64) -> DbResult<Option<Template>>;
    fn update_template(&self, id: i64, patch: &TemplatePatch) -> DbResult<Option<Template>>;
}

/// Past send attempts per (pet, template).
pub trait NotificationHistory: Send + Sync {
    /// Every record for these templates, newest first.
    fn history_for_templates(&self, template_ids: &[i64]) -> DbResult<Vec<SentRecord>>;
    fn has_attempted(&self, pet_id: i64, template_id: i64) -> DbResult<bool>;
    fn most_recent_for_pet(&self, pet_id: i64) -> DbResult<Option<SentRecord>>;
    fn record(&self, record: &NewSentRecord) -> DbResult<RecordOutcome>;
}

/// Precomputed event-triggered reminders.
pub trait PendingScheduleStore: Send + Sync {
    /// `None` when the (event, template) pair is already scheduled.
    fn schedule(&self, schedule: &NewPendingSchedule) -> DbResult<Option<PendingSchedule>>;
    fn due_schedules(&self, today: NaiveDate) -> DbResult<Vec<PendingSchedule>>;
    fn mark_schedule_sent(&self, id: i64, sent_at: &DateTime<Utc>) -> DbResult<bool>;
}

/// Everything the reminder engine needs from storage.
pub trait ReminderStore: PetRegistry + TemplateStore + NotificationHistory + PendingScheduleStore {}

impl<T> ReminderStore for T where
    T: PetRegistry + TemplateStore + NotificationHistory + PendingScheduleStore
{
}

/// Thread-safe database handle shared by the engine and HTTP handlers.
#[derive(Clone)]
pub struct SharedDatabase {
    db: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run a closure against the locked database.
    pub fn with<R>(&self, f: impl FnOnce(&Database) -> DbResult<R>) -> DbResult<R> {
        let db = self.lock()?;
        f(&db)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))
    }
}

impl PetRegistry for SharedDatabase {
    fn pets_with_dob(&self, species: &str) -> DbResult<Vec<Pet>> {
        self.lock()?.list_pets_with_dob(species)
    }

    fn pet(&self, pet_id: i64) -> DbResult<Option<Pet>> {
        self.lock()?.get_pet(pet_id)
    }

    fn owner(&self, owner_id: i64) -> DbResult<Option<Owner>> {
        self.lock()?.get_owner(owner_id)
    }

    fn owners(&self) -> DbResult<Vec<Owner>> {
        self.lock()?.list_owners()
    }
}

impl TemplateStore for SharedDatabase {
    fn active_age_templates(&self, species: &str, category: &str) -> DbResult<Vec<Template>> {
        self.lock()?.list_active_age_templates(species, category)
    }

    fn active_event_templates(&self, species: &str) -> DbResult<Vec<Template>> {
        self.lock()?.list_active_event_templates(species)
    }

    fn template(&self, id: i64) -> DbResult<Option<Template>> {
        self.lock()?.get_template(id)
    }

    fn update_template(&self, id: i64, patch: &TemplatePatch) -> DbResult<Option<Template>> {
        self.lock()?.update_template(id, patch)
    }
}

impl NotificationHistory for SharedDatabase {
    fn history_for_templates(&self, template_ids: &[i64]) -> DbResult<Vec<SentRecord>> {
        self.lock()?.list_records_for_templates(template_ids)
    }

    fn has_attempted(&self, pet_id: i64, template_id: i64) -> DbResult<bool> {
        self.lock()?.has_attempted(pet_id, template_id)
    }

    fn most_recent_for_pet(&self, pet_id: i64) -> DbResult<Option<SentRecord>> {
        self.lock()?.most_recent_for_pet(pet_id)
    }

    fn record(&self, record: &NewSentRecord) -> DbResult<RecordOutcome> {
        self.lock()?.insert_sent_record(record)
    }
}

impl PendingScheduleStore for SharedDatabase {
    fn schedule(&self, schedule: &NewPendingSchedule) -> DbResult<Option<PendingSchedule>> {
        self.lock()?.insert_pending_schedule(schedule)
    }

    fn due_schedules(&self, today: NaiveDate) -> DbResult<Vec<PendingSchedule>> {
        self.lock()?.list_due_pending(today)
    }

    fn mark_schedule_sent(&self, id: i64, sent_at: &DateTime<Utc>) -> DbResult<bool> {
        self.lock()?.mark_pending_sent(id, sent_at)
    }
}
