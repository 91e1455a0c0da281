//! Router integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use vet_reminders_core::engine::{ReminderService, ReminderSettings};
use vet_reminders_core::mail::FakeMailer;
use vet_reminders_core::models::{
    AgeCondition, EventCondition, Owner, Pet, Template, TemplateTrigger,
};
use vet_reminders_core::store::SharedDatabase;
use vet_reminders_server::build_router;
use vet_reminders_server::state::AppState;

struct TestApp {
    router: Router,
    mailer: FakeMailer,
    service: Arc<ReminderService>,
}

fn seed(db: &SharedDatabase) {
    db.with(|db| {
        db.insert_owner(&Owner {
            id: 1,
            name: "Ana".into(),
            email: Some("ana@example.com".into()),
        })?;
        db.insert_pet(&Pet {
            id: 1,
            name: "Rex".into(),
            species: "dog".into(),
            date_of_birth: Some(Utc::now().date_naive() - Duration::weeks(10)),
            owner_id: 1,
        })?;
        db.insert_template(&Template {
            id: 1,
            category: "deworming".into(),
            species: Some("dog".into()),
            name: "First deworming".into(),
            trigger: TemplateTrigger::Age {
                condition: AgeCondition::ExactWeeks(10),
            },
            subject: "{{pet_name}} needs deworming".into(),
            body: "<p>{{note}}</p>".into(),
            days_offset: 0,
            is_active: true,
        })?;
        db.insert_template(&Template {
            id: 2,
            category: "vaccination".into(),
            species: None,
            name: "Rabies booster".into(),
            trigger: TemplateTrigger::Event(EventCondition {
                vaccine: Some("rabies".into()),
                ..Default::default()
            }),
            subject: "Booster for {{pet_name}}".into(),
            body: "<p>Due {{scheduled_date}}</p>".into(),
            days_offset: 14,
            is_active: true,
        })
    })
    .unwrap();
}

async fn test_app(verified: bool) -> TestApp {
    let db = SharedDatabase::open_in_memory().unwrap();
    seed(&db);
    let mailer = FakeMailer::new();
    let service = Arc::new(ReminderService::new(
        Arc::new(db.clone()),
        Arc::new(mailer.clone()),
        ReminderSettings::default(),
    ));
    if verified {
        service.verify_transport().await.unwrap();
    }
    TestApp {
        router: build_router(AppState::new(db, service.clone())),
        mailer,
        service,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_trigger_engine_dispatches_once() {
    let app = test_app(true).await;

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders/dog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatched"], 1);
    assert_eq!(body["scope"]["species"], "dog");

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders/dog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatched"], 0);

    assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_trigger_all_runs_every_engine() {
    let app = test_app(true).await;

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatched"], 1);
    assert_eq!(body["runs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_engine_is_404() {
    let app = test_app(true).await;

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders/parrot", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("parrot"));
}

#[tokio::test]
async fn test_unverified_transport_refuses_triggers() {
    let app = test_app(false).await;

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders/dog", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["transport_ready"], false);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_health_reports_engines() {
    let app = test_app(true).await;

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["transport"], "fake");
    assert_eq!(body["engines"], serde_json::json!(["dog", "cat"]));
}

#[tokio::test]
async fn test_history_lists_failed_attempts() {
    let app = test_app(true).await;
    app.mailer.set_send_fails(true);

    let (_, body) = send(&app.router, Method::POST, "/trigger-reminders/dog", None).await;
    assert_eq!(body["dispatched"], 0);
    assert_eq!(body["failed"], 1);

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/reminder-history?page=1&per_page=10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let entry = &body["entries"][0];
    assert_eq!(entry["status"], "failed");
    assert_eq!(entry["pet_name"], "Rex");
    assert_eq!(entry["template_name"], "First deworming");
    assert!(!entry["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_rejects_page_zero() {
    let app = test_app(true).await;

    let (status, _) = send(&app.router, Method::GET, "/reminder-history?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_template() {
    let app = test_app(true).await;

    let (status, body) = send(
        &app.router,
        Method::PUT,
        "/notification-templates/1",
        Some(serde_json::json!({ "subject": "Time to deworm {{pet_name}}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "Time to deworm {{pet_name}}");
    assert_eq!(body["is_active"], true);

    send(&app.router, Method::POST, "/trigger-reminders/dog", None).await;
    assert_eq!(app.mailer.sent()[0].subject, "Time to deworm Rex");

    let (status, _) = send(
        &app.router,
        Method::PUT,
        "/notification-templates/99",
        Some(serde_json::json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        Method::PUT,
        "/notification-templates/1",
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        Method::PUT,
        "/notification-templates/1",
        Some(serde_json::json!({ "days_offset": 9_000_000_000_000i64 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("days_offset"));
}

#[tokio::test]
async fn test_vaccination_event_then_pending_pass() {
    let app = test_app(true).await;
    let event_date = Utc::now().date_naive() - Duration::days(14);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/vaccination-events",
        Some(serde_json::json!({
            "event_ref": "vax-1",
            "pet_id": 1,
            "vaccine": "Rabies",
            "event_date": event_date,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["event_ref"], "vax-1");
    assert_eq!(body["scheduled"].as_array().unwrap().len(), 1);

    // Same event again schedules nothing new
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/vaccination-events",
        Some(serde_json::json!({
            "event_ref": "vax-1",
            "pet_id": 1,
            "vaccine": "Rabies",
            "event_date": event_date,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["scheduled"].as_array().unwrap().is_empty());

    let (status, body) = send(&app.router, Method::POST, "/trigger-reminders/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatched"], 1);
    assert_eq!(app.mailer.sent()[0].subject, "Booster for Rex");

    let (_, body) = send(
        &app.router,
        Method::GET,
        "/reminder-history?kind=pending",
        None,
    )
    .await;
    assert_eq!(body["entries"][0]["status"], "sent");
}

#[tokio::test]
async fn test_vaccination_for_unknown_pet_is_404() {
    let app = test_app(true).await;

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/vaccination-events",
        Some(serde_json::json!({
            "pet_id": 77,
            "vaccine": "rabies",
            "event_date": "2026-03-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.service.is_transport_ready());
}
