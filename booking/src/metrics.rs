//! Business metrics for the booking engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `autoshop_bookings_total{outcome}` - Booking submissions by outcome
//!   (admitted, capacity_conflict, validation_failed)
//! - `autoshop_appointment_transitions_total{to}` - Applied status changes by target status
//! - `autoshop_notifications_total{target,outcome}` - Notification deliveries
//!   (target: customer, admin; outcome: sent, failed, skipped)
//! - `autoshop_settings_cache_total{result}` - Settings cache lookups and
//!   invalidations (hit, miss, invalidated)
//!
//! Without an installed recorder every call is a no-op.

use autoshop_core::AppointmentStatus;
use metrics::describe_counter;

/// Outcome label for `autoshop_bookings_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Appointment committed
    Admitted,
    /// Slot was full
    CapacityConflict,
    /// Request rejected before reaching the store
    ValidationFailed,
}

impl BookingOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::CapacityConflict => "capacity_conflict",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "autoshop_bookings_total",
        "Booking submissions by outcome (admitted, capacity_conflict, validation_failed)"
    );
    describe_counter!(
        "autoshop_appointment_transitions_total",
        "Appointment status changes by target status"
    );
    describe_counter!(
        "autoshop_notifications_total",
        "Booking notifications by target (customer, admin) and outcome (sent, failed, skipped)"
    );
    describe_counter!(
        "autoshop_settings_cache_total",
        "Settings cache lookups and invalidations (hit, miss, invalidated)"
    );

    tracing::info!("Business metrics registered");
}

/// Record a booking submission outcome.
pub fn record_booking(outcome: BookingOutcome) {
    metrics::counter!("autoshop_bookings_total", "outcome" => outcome.label()).increment(1);
}

/// Record an applied status change.
pub fn record_transition(to: AppointmentStatus) {
    metrics::counter!("autoshop_appointment_transitions_total", "to" => to.as_str()).increment(1);
}

/// Record a notification delivery attempt that ran to completion.
pub fn record_notification(target: &'static str, outcome: &'static str) {
    metrics::counter!("autoshop_notifications_total", "target" => target, "outcome" => outcome)
        .increment(1);
    tracing::debug!(recipient = target, outcome, "Recorded notification metric");
}

/// Record a settings cache event.
pub fn record_settings_cache(result: &'static str) {
    metrics::counter!("autoshop_settings_cache_total", "result" => result).increment(1);
}
