use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health: liveness plus mail transport readiness.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let ready = app.service.is_transport_ready();
    let engines: Vec<&str> = app
        .service
        .engines()
        .iter()
        .map(|e| e.name.as_str())
        .collect();

    Json(serde_json::json!({
        "status": if ready { "ok" } else { "degraded" },
        "transport": app.service.transport_name(),
        "transport_ready": ready,
        "engines": engines,
    }))
}
