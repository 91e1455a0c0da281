use axum::extract::{Query, State};
use axum::Json;
use vet_reminders_core::db::{HistoryPage, HistoryQuery};

use crate::error::AppError;
use crate::state::AppState;

/// GET /reminder-history: paginated sent records or pending schedules.
pub async fn get_history(
    State(app): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    if query.page == 0 {
        return Err(AppError::bad_request("page starts at 1"));
    }

    let db = app.db.clone();
    let page = tokio::task::spawn_blocking(move || db.with(|db| db.history_page(&query)))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(page))
}
