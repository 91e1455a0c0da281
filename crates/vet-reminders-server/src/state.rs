use std::sync::Arc;

use vet_reminders_core::engine::ReminderService;
use vet_reminders_core::store::SharedDatabase;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    pub service: Arc<ReminderService>,
}

impl AppState {
    pub fn new(db: SharedDatabase, service: Arc<ReminderService>) -> Self {
        Self { db, service }
    }
}
