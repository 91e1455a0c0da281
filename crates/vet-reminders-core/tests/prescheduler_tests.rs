//! Event-triggered reminder integration tests.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use vet_reminders_core::db::{HistoryKind, HistoryQuery};
use vet_reminders_core::engine::{EngineError, ReminderService, ReminderSettings, TriggerSource};
use vet_reminders_core::mail::FakeMailer;
use vet_reminders_core::models::{
    EventCondition, Owner, Pet, RecordOrigin, Template, TemplatePatch, TemplateTrigger,
    VaccinationEvent,
};
use vet_reminders_core::store::{NotificationHistory, SharedDatabase};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Duration::days(offset)
}

fn event_template(id: i64, vaccine: Option<&str>, days_offset: i64) -> Template {
    Template {
        id,
        category: "vaccination".into(),
        species: Some("dog".into()),
        name: format!("Booster {}", id),
        trigger: TemplateTrigger::Event(EventCondition {
            vaccine: vaccine.map(str::to_string),
            min_age_weeks: None,
            max_age_weeks: None,
        }),
        subject: "{{pet_name}}: {{vaccine}} booster".into(),
        body: "<p>{{pet_name}} is due on {{scheduled_date}}.</p>".into(),
        days_offset,
        is_active: true,
    }
}

fn setup_store() -> SharedDatabase {
    let store = SharedDatabase::open_in_memory().unwrap();
    store
        .with(|db| {
            db.insert_owner(&Owner {
                id: 1,
                name: "Ana".into(),
                email: Some("ana@example.com".into()),
            })?;
            db.insert_pet(&Pet {
                id: 1,
                name: "Buddy".into(),
                species: "dog".into(),
                date_of_birth: Some(day(-140)),
                owner_id: 1,
            })?;
            db.insert_template(&event_template(1, Some("rabies"), 14))
        })
        .unwrap();
    store
}

async fn ready_service(store: &SharedDatabase, mailer: &FakeMailer) -> ReminderService {
    let service = ReminderService::new(
        Arc::new(store.clone()),
        Arc::new(mailer.clone()),
        ReminderSettings::default(),
    );
    service.verify_transport().await.unwrap();
    service
}

#[tokio::test]
async fn test_vaccination_promoted_on_day_fourteen_once() {
    let store = setup_store();
    let mailer = FakeMailer::new();
    let service = ready_service(&store, &mailer).await;

    let created = service
        .record_vaccination(&VaccinationEvent::new(1, "Rabies", day(0)))
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].scheduled_date, day(14));
    assert!(!created[0].is_sent);

    let day13 = service
        .run_pending_pass_on(day(13), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert_eq!(day13.due, 0);
    assert!(mailer.sent().is_empty());

    let day14 = service
        .run_pending_pass_on(day(14), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert_eq!(day14.dispatched, 1);

    let day15 = service
        .run_pending_pass_on(day(15), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert_eq!(day15.due, 0);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Buddy: rabies booster");
    assert_eq!(sent[0].html, "<p>Buddy is due on 2026-03-15.</p>");

    let stored = store
        .with(|db| db.get_pending_schedule(created[0].id))
        .unwrap()
        .unwrap();
    assert!(stored.is_sent);

    let records = store.history_for_templates(&[1]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].origin, RecordOrigin::Pending);
}

#[tokio::test]
async fn test_redelivered_event_is_idempotent() {
    let store = setup_store();
    let mailer = FakeMailer::new();
    let service = ready_service(&store, &mailer).await;

    let event = VaccinationEvent::new(1, "rabies", day(0));
    assert_eq!(service.record_vaccination(&event).unwrap().len(), 1);
    assert!(service.record_vaccination(&event).unwrap().is_empty());

    // A different vaccination of the same kind schedules again
    let another = VaccinationEvent::new(1, "rabies", day(30));
    assert_eq!(service.record_vaccination(&another).unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_matching_vaccine_schedules_nothing() {
    let store = setup_store();
    let service = ready_service(&store, &FakeMailer::new()).await;

    let created = service
        .record_vaccination(&VaccinationEvent::new(1, "distemper", day(0)))
        .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn test_age_bounds_use_age_at_event() {
    let store = setup_store();
    store
        .with(|db| {
            let mut puppy_only = event_template(2, None, 7);
            puppy_only.trigger = TemplateTrigger::Event(EventCondition {
                vaccine: None,
                min_age_weeks: None,
                max_age_weeks: Some(16),
            });
            db.insert_template(&puppy_only)
        })
        .unwrap();
    let service = ready_service(&store, &FakeMailer::new()).await;

    // Buddy is 20 weeks old on day 0
    let created = service
        .record_vaccination(&VaccinationEvent::new(1, "rabies", day(0)))
        .unwrap();
    let templates: Vec<i64> = created.iter().map(|s| s.template_id).collect();
    assert_eq!(templates, vec![1]);

    // ...and 12 weeks old 8 weeks earlier
    let created = service
        .record_vaccination(&VaccinationEvent::new(1, "parvo", day(-56)))
        .unwrap();
    let templates: Vec<i64> = created.iter().map(|s| s.template_id).collect();
    assert_eq!(templates, vec![2]);
}

#[tokio::test]
async fn test_failed_send_stays_pending_and_retries() {
    let store = setup_store();
    let mailer = FakeMailer::new();
    let service = ready_service(&store, &mailer).await;
    service
        .record_vaccination(&VaccinationEvent::new(1, "rabies", day(0)))
        .unwrap();

    mailer.set_send_fails(true);
    let failed = service
        .run_pending_pass_on(day(14), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert_eq!(failed.failed, 1);
    assert_eq!(failed.dispatched, 0);

    mailer.set_send_fails(false);
    let retried = service
        .run_pending_pass_on(day(15), TriggerSource::Scheduled)
        .await
        .unwrap();
    assert_eq!(retried.dispatched, 1);
    assert_eq!(mailer.attempts(), 2);

    let page = store
        .with(|db| {
            db.history_page(&HistoryQuery {
                kind: HistoryKind::Pending,
                ..Default::default()
            })
        })
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.entries[0].status, "sent");
}

#[tokio::test]
async fn test_pending_pass_sends_several_per_pet() {
    let store = setup_store();
    store
        .with(|db| db.insert_template(&event_template(2, Some("rabies"), 14)))
        .unwrap();
    let mailer = FakeMailer::new();
    let service = ready_service(&store, &mailer).await;

    let created = service
        .record_vaccination(&VaccinationEvent::new(1, "rabies", day(0)))
        .unwrap();
    assert_eq!(created.len(), 2);

    let summary = service
        .run_pending_pass_on(day(20), TriggerSource::Manual)
        .await
        .unwrap();
    assert_eq!(summary.due, 2);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_unknown_pet_and_blank_vaccine_rejected() {
    let store = setup_store();
    let service = ready_service(&store, &FakeMailer::new()).await;

    assert!(matches!(
        service.record_vaccination(&VaccinationEvent::new(42, "rabies", day(0))),
        Err(EngineError::PetNotFound(42))
    ));
    assert!(matches!(
        service.record_vaccination(&VaccinationEvent::new(1, "  ", day(0))),
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_event_templates_ignored_by_age_cycle() {
    let store = setup_store();
    store
        .with(|db| {
            let mut t = event_template(2, None, 0);
            t.category = "deworming".into();
            db.insert_template(&t)
        })
        .unwrap();
    let mailer = FakeMailer::new();
    let service = ready_service(&store, &mailer).await;

    let summary = service.run_engine("dog", TriggerSource::Manual).await.unwrap();
    assert_eq!(summary.templates, 0);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_out_of_range_offset_edit_is_rejected() {
    let store = setup_store();
    let service = ready_service(&store, &FakeMailer::new()).await;

    for days_offset in [-1, 3651, 9_000_000_000_000] {
        let patch = TemplatePatch {
            days_offset: Some(days_offset),
            ..Default::default()
        };
        assert!(matches!(
            service.update_template(1, &patch).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    let stored = store.with(|db| db.get_template(1)).unwrap().unwrap();
    assert_eq!(stored.days_offset, 14);

    let patch = TemplatePatch {
        days_offset: Some(3650),
        ..Default::default()
    };
    assert_eq!(service.update_template(1, &patch).await.unwrap().days_offset, 3650);
}

#[tokio::test]
async fn test_unrepresentable_offset_fails_without_scheduling() {
    let store = setup_store();
    store
        .with(|db| {
            db.insert_template(&event_template(2, Some("dhpp"), 9_000_000_000_000))?;
            db.insert_template(&event_template(3, Some("lepto"), 1_000_000_000))
        })
        .unwrap();
    let service = ready_service(&store, &FakeMailer::new()).await;

    for vaccine in ["dhpp", "lepto"] {
        assert!(matches!(
            service.record_vaccination(&VaccinationEvent::new(1, vaccine, day(0))),
            Err(EngineError::InvalidInput(_))
        ));
    }
    assert!(store
        .with(|db| db.list_due_pending(day(100_000)))
        .unwrap()
        .is_empty());
}
