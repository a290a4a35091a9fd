//! Router configuration for the booking engine.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{admin, appointments, availability, services};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Every request gets a correlation id (echoed in `X-Correlation-ID`) and an
/// `http_request` span.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Catalog
        .route("/services", get(services::list_services))
        .route("/services/:slug", get(services::get_service))
        // Booking
        .route("/appointments", post(appointments::create_appointment))
        .route(
            "/appointments/availability",
            get(availability::get_availability),
        )
        .route("/appointments/:id", get(appointments::get_appointment))
        // Settings and back office
        .route("/settings", get(admin::get_settings))
        .route("/admin/settings", put(admin::update_settings))
        .route("/admin/mail-recipient", put(admin::assign_mail_recipient))
        .route(
            "/admin/appointments/:id/status",
            post(admin::change_status),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(autoshop_web::correlation_id))
        .with_state(state)
}
