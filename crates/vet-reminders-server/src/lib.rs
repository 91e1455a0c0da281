pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the axum Router with all routes and middleware.
/// Used by `main` and available for integration testing.
pub fn build_router(state: state::AppState) -> Router {
    Router::new()
        // Triggers
        .route("/trigger-reminders", post(routes::triggers::trigger_all))
        .route(
            "/trigger-reminders/pending",
            post(routes::triggers::trigger_pending),
        )
        .route(
            "/trigger-reminders/{engine}",
            post(routes::triggers::trigger_engine),
        )
        // History
        .route("/reminder-history", get(routes::history::get_history))
        // Templates
        .route(
            "/notification-templates/{id}",
            put(routes::templates::update_template),
        )
        // Events
        .route(
            "/vaccination-events",
            post(routes::events::record_vaccination),
        )
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
