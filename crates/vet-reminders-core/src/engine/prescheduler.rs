//! Event-triggered reminders: schedule up front, promote when due.
//!
//! Unlike age-condition cycles, a pending pass may send several reminders
//! to the same pet, and a failed send leaves the row pending so the next
//! pass retries it.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::age::age_in_weeks_on;
use super::dispatcher::{DispatchRequest, Dispatcher};
use super::render::ReminderContext;
use super::{EngineError, EngineResult};
use crate::db::DbResult;
use crate::models::{
    NewPendingSchedule, Owner, PendingSchedule, Pet, RecordOrigin, Template, TemplateTrigger,
    VaccinationEvent,
};
use crate::store::ReminderStore;

/// What a pending pass did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPassSummary {
    pub today: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Rows due at the start of the pass
    pub due: usize,
    pub dispatched: usize,
    /// Failed sends; these rows stay pending
    pub failed: usize,
    /// Rows that could not be resolved to a reachable owner or active template
    pub skipped: usize,
}

/// Everything needed to send one pending row.
struct Resolved {
    pet: Pet,
    owner: Owner,
    email: String,
    template: Template,
}

pub struct PreScheduler {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<Dispatcher>,
}

impl PreScheduler {
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Schedule every active event template matching this vaccination.
    ///
    /// Returns the rows created; re-delivering an event creates nothing.
    pub fn on_vaccination(&self, event: &VaccinationEvent) -> EngineResult<Vec<PendingSchedule>> {
        if event.vaccine.trim().is_empty() {
            return Err(EngineError::InvalidInput("vaccine is required".into()));
        }
        if event.event_ref.trim().is_empty() {
            return Err(EngineError::InvalidInput("event_ref is empty".into()));
        }

        let pet = self
            .store
            .pet(event.pet_id)?
            .ok_or(EngineError::PetNotFound(event.pet_id))?;
        let age = pet
            .date_of_birth
            .map(|dob| age_in_weeks_on(dob, event.event_date));

        let mut created = Vec::new();
        for template in self.store.active_event_templates(&pet.canonical_species())? {
            let TemplateTrigger::Event(condition) = &template.trigger else {
                continue;
            };
            if !condition.matches(&event.vaccine, age) {
                continue;
            }

            let scheduled_date = Duration::try_days(template.days_offset)
                .and_then(|offset| event.event_date.checked_add_signed(offset))
                .ok_or_else(|| {
                    EngineError::InvalidInput(format!(
                        "template {} offset of {} days is out of range",
                        template.id, template.days_offset
                    ))
                })?;
            let schedule = NewPendingSchedule {
                pet_id: pet.id,
                template_id: template.id,
                source_event: event.event_ref.clone(),
                scheduled_date,
            };
            match self.store.schedule(&schedule)? {
                Some(row) => {
                    info!(
                        pet_id = row.pet_id,
                        template_id = row.template_id,
                        scheduled_date = %row.scheduled_date,
                        "reminder scheduled"
                    );
                    created.push(row);
                }
                None => debug!(
                    template_id = template.id,
                    event = %event.event_ref,
                    "event already scheduled for template"
                ),
            }
        }
        Ok(created)
    }

    /// Dispatch every unsent row due on or before `today`.
    pub async fn run_pending_pass(&self, today: NaiveDate) -> EngineResult<PendingPassSummary> {
        let started_at = Utc::now();
        let due = self.store.due_schedules(today)?;

        let mut summary = PendingPassSummary {
            today,
            started_at,
            finished_at: started_at,
            due: due.len(),
            dispatched: 0,
            failed: 0,
            skipped: 0,
        };

        for schedule in &due {
            let resolved = match self.resolve(schedule) {
                Ok(Some(resolved)) => resolved,
                Ok(None) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(schedule_id = schedule.id, error = %e, "could not load pending reminder");
                    summary.skipped += 1;
                    continue;
                }
            };

            let context = pending_context(&resolved, schedule, today);
            let request = DispatchRequest {
                pet_id: resolved.pet.id,
                owner_id: resolved.owner.id,
                email: &resolved.email,
                template: &resolved.template,
                context,
                origin: RecordOrigin::Pending,
            };

            let outcome = self.dispatcher.dispatch(request).await;
            if !outcome.delivered() {
                summary.failed += 1;
                continue;
            }

            let sent_at = outcome.record().map(|r| r.sent_at).unwrap_or_else(Utc::now);
            match self.store.mark_schedule_sent(schedule.id, &sent_at) {
                Ok(true) => {}
                Ok(false) => warn!(schedule_id = schedule.id, "pending reminder was already marked sent"),
                Err(e) => error!(schedule_id = schedule.id, error = %e, "failed to mark pending reminder sent"),
            }
            summary.dispatched += 1;
        }

        summary.finished_at = Utc::now();
        info!(
            %today,
            due = summary.due,
            dispatched = summary.dispatched,
            failed = summary.failed,
            skipped = summary.skipped,
            "pending pass complete"
        );
        Ok(summary)
    }

    fn resolve(&self, schedule: &PendingSchedule) -> DbResult<Option<Resolved>> {
        let Some(template) = self.store.template(schedule.template_id)? else {
            debug!(schedule_id = schedule.id, "template no longer exists");
            return Ok(None);
        };
        if !template.is_active {
            debug!(schedule_id = schedule.id, "template inactive, leaving pending");
            return Ok(None);
        }
        let Some(pet) = self.store.pet(schedule.pet_id)? else {
            return Ok(None);
        };
        let Some(owner) = self.store.owner(pet.owner_id)? else {
            return Ok(None);
        };
        let Some(email) = owner.contact_email().map(str::to_string) else {
            debug!(schedule_id = schedule.id, owner_id = owner.id, "no contact email");
            return Ok(None);
        };

        Ok(Some(Resolved {
            pet,
            owner,
            email,
            template,
        }))
    }
}

fn pending_context(resolved: &Resolved, schedule: &PendingSchedule, today: NaiveDate) -> ReminderContext {
    let vaccine = match &resolved.template.trigger {
        TemplateTrigger::Event(condition) => condition.vaccine.clone(),
        TemplateTrigger::Age { .. } => None,
    };

    ReminderContext {
        pet_name: resolved.pet.name.clone(),
        owner_name: resolved.owner.name.clone(),
        species: resolved.pet.species.clone(),
        template_name: resolved.template.name.clone(),
        age_weeks: resolved
            .pet
            .date_of_birth
            .map(|dob| age_in_weeks_on(dob, today)),
        vaccine,
        scheduled_date: Some(schedule.scheduled_date),
        ..Default::default()
    }
}
