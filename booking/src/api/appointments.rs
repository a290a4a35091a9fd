//! Appointment endpoints.
//!
//! - POST /api/appointments - Book an appointment
//! - GET /api/appointments/:id - Read an appointment

use crate::admission::BookingRequest;
use crate::server::state::AppState;
use autoshop_core::appointment::Appointment;
use autoshop_core::ids::AppointmentId;
use autoshop_core::pricing::PriceQuote;
use autoshop_web::{ApiJson, ApiPath, AppError, CorrelationId};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// A newly booked appointment with its price breakdown.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// The stored appointment
    #[serde(flatten)]
    pub appointment: Appointment,
    /// How the estimated price was computed
    pub quote: PriceQuote,
}

/// Book an appointment.
///
/// Returns 201 once the appointment is stored. Confirmation mail is sent in
/// the background and never affects the response.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/appointments \
///   -H "Content-Type: application/json" \
///   -d '{"serviceIds":[1],"date":"2024-06-11","time":"09:00",
///        "vehicle":{"type":"car","make":"Honda","model":"Civic","year":2019},
///        "customer":{"fullName":"Jane Doe","phone":"555-0100","email":"jane@example.com"},
///        "serviceRequirements":{"1":{"oil_type":"synthetic"}}}'
/// ```
///
/// # Errors
///
/// - 422 with a field-keyed `errors` map when the request is invalid
/// - 409 `CAPACITY_CONFLICT` when the slot filled up
pub async fn create_appointment(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    tracing::debug!(correlation_id = %correlation_id.0, date = %request.date, time = %request.time, "Booking request");

    let admitted = state.app.booking.submit(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            appointment: admitted.appointment,
            quote: admitted.quote,
        }),
    ))
}

/// Read an appointment.
///
/// # Errors
///
/// Returns 404 for an unknown id.
pub async fn get_appointment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.app.lifecycle.get(id).await?;
    Ok(Json(appointment))
}
