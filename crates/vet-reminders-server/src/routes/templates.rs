use axum::extract::{Path, State};
use axum::Json;
use vet_reminders_core::models::{Template, TemplatePatch};

use crate::error::AppError;
use crate::state::AppState;

/// PUT /notification-templates/{id}: edit subject, body, offset or active flag.
pub async fn update_template(
    State(app): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<TemplatePatch>,
) -> Result<Json<Template>, AppError> {
    let template = app.service.update_template(id, &patch).await?;
    Ok(Json(template))
}
