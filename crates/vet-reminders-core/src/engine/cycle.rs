//! One full age-condition pass over a species.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::age::age_in_weeks;
use super::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
use super::evaluator::{evaluate, DueReminder, Evaluation};
use super::history::HistoryIndex;
use super::policy::{DispatchPolicy, EvaluationPolicy};
use super::render::{cadence_note, ReminderContext};
use super::EngineResult;
use crate::models::{Owner, Pet, RecordOrigin, Template};
use crate::store::ReminderStore;

/// The templates and pets one engine covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineScope {
    /// Engine name used in routes and logs (e.g., "dog")
    pub name: String,
    pub species: String,
    pub category: String,
}

impl EngineScope {
    pub fn new(
        name: impl Into<String>,
        species: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            species: species.into(),
            category: category.into(),
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub scope: EngineScope,
    /// Instant conditions were evaluated against
    pub reference: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub templates: usize,
    pub evaluated_pets: usize,
    /// Pets without a reachable owner
    pub skipped_pets: usize,
    /// Successful sends
    pub dispatched: usize,
    /// Failed sends (recorded)
    pub failed: usize,
    /// Reminders another run had already recorded
    pub duplicates: usize,
    /// Attempts whose record could not be written
    pub unrecorded: usize,
}

pub struct CycleRunner {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<Dispatcher>,
    policy: EvaluationPolicy,
}

impl CycleRunner {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        dispatcher: Arc<Dispatcher>,
        policy: EvaluationPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            policy,
        }
    }

    /// Run one cycle, evaluating conditions as of `now`.
    ///
    /// Everything is loaded before the first dispatch, so a load failure
    /// aborts without writing anything.
    pub async fn run(&self, scope: &EngineScope, now: DateTime<Utc>) -> EngineResult<CycleSummary> {
        let started_at = Utc::now();

        let templates = self
            .store
            .active_age_templates(&scope.species, &scope.category)?;
        let mut summary = CycleSummary {
            scope: scope.clone(),
            reference: now,
            started_at,
            finished_at: started_at,
            templates: templates.len(),
            evaluated_pets: 0,
            skipped_pets: 0,
            dispatched: 0,
            failed: 0,
            duplicates: 0,
            unrecorded: 0,
        };
        if templates.is_empty() {
            summary.finished_at = Utc::now();
            info!(engine = %scope.name, "no active templates, nothing to do");
            return Ok(summary);
        }

        let pets = self.store.pets_with_dob(&scope.species)?;
        let owners: HashMap<i64, Owner> = self
            .store
            .owners()?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();
        let template_ids: Vec<i64> = templates.iter().map(|t| t.id).collect();
        let mut history = HistoryIndex::from_records(self.store.history_for_templates(&template_ids)?);

        debug!(
            engine = %scope.name,
            templates = templates.len(),
            pets = pets.len(),
            records = history.record_count(),
            "cycle loaded"
        );

        for pet in &pets {
            let Some(dob) = pet.date_of_birth else {
                continue;
            };
            let Some((owner, email)) = reachable_owner(&owners, pet) else {
                debug!(pet_id = pet.id, owner_id = pet.owner_id, "no contact email, skipping pet");
                summary.skipped_pets += 1;
                continue;
            };

            summary.evaluated_pets += 1;
            let age = age_in_weeks(dob, now);

            for template in &templates {
                let due = match evaluate(template, age, history.for_pet(pet.id), &self.policy, now) {
                    Evaluation::Due(due) => due,
                    Evaluation::NotDue(reason) => {
                        debug!(pet_id = pet.id, template_id = template.id, ?reason, "not due");
                        continue;
                    }
                };

                let request = DispatchRequest {
                    pet_id: pet.id,
                    owner_id: owner.id,
                    email,
                    template,
                    context: reminder_context(pet, owner, template, &due),
                    origin: RecordOrigin::Cycle,
                };

                match self.dispatcher.dispatch(request).await {
                    DispatchOutcome::Sent(record) => {
                        summary.dispatched += 1;
                        history.push(record);
                    }
                    DispatchOutcome::Failed(record) => {
                        summary.failed += 1;
                        history.push(record);
                    }
                    DispatchOutcome::Duplicate => summary.duplicates += 1,
                    DispatchOutcome::NotRecorded { delivered, .. } => {
                        summary.unrecorded += 1;
                        if delivered {
                            summary.dispatched += 1;
                        } else {
                            summary.failed += 1;
                        }
                    }
                }

                if self.policy.dispatch == DispatchPolicy::FirstMatchPerPet {
                    break;
                }
            }
        }

        summary.finished_at = Utc::now();
        info!(
            engine = %scope.name,
            evaluated = summary.evaluated_pets,
            skipped = summary.skipped_pets,
            dispatched = summary.dispatched,
            failed = summary.failed,
            duplicates = summary.duplicates,
            "cycle complete"
        );
        Ok(summary)
    }
}

fn reachable_owner<'a>(owners: &'a HashMap<i64, Owner>, pet: &Pet) -> Option<(&'a Owner, &'a str)> {
    let owner = owners.get(&pet.owner_id)?;
    Some((owner, owner.contact_email()?))
}

fn reminder_context(pet: &Pet, owner: &Owner, template: &Template, due: &DueReminder) -> ReminderContext {
    ReminderContext {
        pet_name: pet.name.clone(),
        owner_name: owner.name.clone(),
        species: pet.species.clone(),
        template_name: template.name.clone(),
        age_weeks: Some(due.age_weeks),
        next_due: due.next_due,
        note: template.age_condition().map(cadence_note),
        ..Default::default()
    }
    .with_last_sent(due.last_sent)
}
