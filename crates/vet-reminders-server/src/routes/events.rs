use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use vet_reminders_core::models::VaccinationEvent;

use crate::error::AppError;
use crate::state::AppState;

/// POST /vaccination-events: schedule reminders for a recorded vaccination.
pub async fn record_vaccination(
    State(app): State<AppState>,
    Json(event): Json<VaccinationEvent>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let service = app.service.clone();
    let (event, scheduled) = tokio::task::spawn_blocking(move || {
        let scheduled = service.record_vaccination(&event)?;
        Ok::<_, vet_reminders_core::EngineError>((event, scheduled))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let status = if scheduled.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(serde_json::json!({
            "event_ref": event.event_ref,
            "scheduled": scheduled,
        })),
    ))
}
