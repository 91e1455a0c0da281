use axum::extract::{Path, State};
use axum::Json;
use vet_reminders_core::engine::{CycleSummary, PendingPassSummary, RunAllSummary, TriggerSource};

use crate::error::AppError;
use crate::state::AppState;

/// POST /trigger-reminders: run every configured engine.
pub async fn trigger_all(State(app): State<AppState>) -> Result<Json<RunAllSummary>, AppError> {
    let summary = app.service.run_all(TriggerSource::Manual).await?;
    Ok(Json(summary))
}

/// POST /trigger-reminders/{engine}: run one engine.
pub async fn trigger_engine(
    State(app): State<AppState>,
    Path(engine): Path<String>,
) -> Result<Json<CycleSummary>, AppError> {
    let summary = app.service.run_engine(&engine, TriggerSource::Manual).await?;
    Ok(Json(summary))
}

/// POST /trigger-reminders/pending: promote due pending reminders now.
pub async fn trigger_pending(
    State(app): State<AppState>,
) -> Result<Json<PendingPassSummary>, AppError> {
    let summary = app.service.run_pending_pass(TriggerSource::Manual).await?;
    Ok(Json(summary))
}
