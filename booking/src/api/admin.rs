//! Settings and back-office endpoints.
//!
//! - GET /api/settings - Current shop setting
//! - PUT /api/admin/settings - Replace the shop setting
//! - PUT /api/admin/mail-recipient - Choose the staff member receiving booking mail
//! - POST /api/admin/appointments/:id/status - Move an appointment along its lifecycle

use crate::lifecycle::StatusRequest;
use crate::server::state::AppState;
use autoshop_core::appointment::Appointment;
use autoshop_core::customer::StaffUser;
use autoshop_core::ids::{AppointmentId, UserId};
use autoshop_core::schedule::Setting;
use autoshop_web::{ApiJson, ApiPath, AppError};
use axum::{extract::State, Json};
use serde::Deserialize;

/// Body of `PUT /api/admin/mail-recipient`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailRecipientRequest {
    /// Staff user to receive booking mail
    pub user_id: UserId,
}

/// Current shop setting, served from the settings cache.
///
/// # Errors
///
/// Returns 500 when the setting cannot be loaded.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Setting>, AppError> {
    let setting = state.app.settings.current().await?;
    Ok(Json(Setting::clone(&setting)))
}

/// Replace the shop setting.
///
/// The new value is visible to availability and booking as soon as this
/// returns.
///
/// # Errors
///
/// Returns 422 for an invalid setting.
pub async fn update_settings(
    State(state): State<AppState>,
    ApiJson(setting): ApiJson<Setting>,
) -> Result<Json<Setting>, AppError> {
    let setting = state.app.settings.update(setting).await?;
    Ok(Json(setting))
}

/// Make one staff user the booking mail recipient.
///
/// # Errors
///
/// Returns 404 for an unknown user.
pub async fn assign_mail_recipient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MailRecipientRequest>,
) -> Result<Json<StaffUser>, AppError> {
    let user = state.app.assign_mail_recipient(request.user_id).await?;
    Ok(Json(user))
}

/// Change an appointment's status.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/admin/appointments/42/status \
///   -H "Content-Type: application/json" \
///   -d '{"status":"completed","finalPrice":"72.50"}'
/// ```
///
/// # Errors
///
/// - 404 for an unknown appointment
/// - 409 `INVALID_TRANSITION` when the move is not allowed
/// - 422 when `finalPrice` accompanies a status other than `completed`
pub async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.app.lifecycle.transition(id, request).await?;
    Ok(Json(appointment))
}
