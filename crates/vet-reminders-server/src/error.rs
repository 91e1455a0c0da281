use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vet_reminders_core::db::DbError;
use vet_reminders_core::engine::EngineError;

/// Carries an explicit 400 through the `anyhow::Error` chain.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<BadRequestError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        if let Some(e) = self.0.downcast_ref::<EngineError>() {
            return match e {
                EngineError::UnknownEngine(_)
                | EngineError::PetNotFound(_)
                | EngineError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
                EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                EngineError::TransportNotReady | EngineError::Mail(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                EngineError::Store(db) => db_status(db),
            };
        }
        if let Some(e) = self.0.downcast_ref::<DbError>() {
            return db_status(e);
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn db_status(e: &DbError) -> StatusCode {
    match e {
        DbError::NotFound(_) => StatusCode::NOT_FOUND,
        DbError::Constraint(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
