//! Appointment lifecycle operations.

use crate::error::{BookingError, ValidationError};
use crate::metrics;
use autoshop_core::appointment::{Appointment, AppointmentStatus, StatusChange};
use autoshop_core::environment::Clock;
use autoshop_core::ids::AppointmentId;
use autoshop_core::money::Money;
use autoshop_core::store::AppointmentStore;
use serde::Deserialize;
use std::sync::Arc;

/// An admin status change as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    /// Target status
    pub status: AppointmentStatus,
    /// Charged price; only with `completed`
    #[serde(default)]
    pub final_price: Option<Money>,
}

/// Reads appointments and moves them along the lifecycle graph.
#[derive(Clone)]
pub struct LifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    /// Service over `appointments`.
    #[must_use]
    pub fn new(appointments: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            appointments,
            clock,
        }
    }

    /// Loads one appointment.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown id.
    pub async fn get(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        Ok(self.appointments.get(id).await?)
    }

    /// Applies a status change. This is the only way a status changes after
    /// admission.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] when `finalPrice` accompanies a target
    ///   other than `completed`
    /// - [`BookingError::NotFound`] for an unknown id
    /// - [`BookingError::InvalidTransition`] when the graph forbids the move
    pub async fn transition(
        &self,
        id: AppointmentId,
        request: StatusRequest,
    ) -> Result<Appointment, BookingError> {
        if request.final_price.is_some() && request.status != AppointmentStatus::Completed {
            return Err(ValidationError::field(
                "finalPrice",
                "may only be set when completing an appointment",
            )
            .into());
        }

        let change = StatusChange {
            to: request.status,
            final_price: request.final_price,
            at: self.clock.now(),
        };
        match self.appointments.transition(id, change).await {
            Ok(appointment) => {
                metrics::record_transition(appointment.status);
                tracing::info!(appointment_id = %id, status = %appointment.status, "Appointment status changed");
                Ok(appointment)
            }
            Err(error) => {
                let error = BookingError::from(error);
                if let BookingError::InvalidTransition(invalid) = &error {
                    tracing::info!(appointment_id = %id, %invalid, "Status change refused");
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use autoshop_core::appointment::NewAppointment;
    use autoshop_core::capacity::SlotLimits;
    use autoshop_core::ids::{CustomerId, ServiceId, VehicleId};
    use autoshop_core::schedule::Slot;
    use autoshop_core::InvalidTransition;
    use autoshop_testing::stores::InMemoryAppointmentStore;
    use autoshop_testing::test_clock;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::BTreeMap;
    use AppointmentStatus::{Cancelled, Completed, InProgress, Scheduled};

    async fn booked() -> (LifecycleService, AppointmentId) {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let clock = Arc::new(test_clock());
        let appointment = store
            .admit(
                NewAppointment {
                    customer_id: CustomerId::new(1),
                    vehicle_id: VehicleId::new(1),
                    service_ids: vec![ServiceId::new(1)],
                    slot: Slot::new(
                        NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(),
                        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    ),
                    estimated_price: Money::from_cents(4500),
                    notes: None,
                    service_requirements: BTreeMap::new(),
                    requested_at: clock.now(),
                },
                SlotLimits::new(1),
            )
            .await
            .unwrap();
        (LifecycleService::new(store, clock), appointment.id)
    }

    fn to(status: AppointmentStatus) -> StatusRequest {
        StatusRequest {
            status,
            final_price: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_sets_final_price() {
        let (lifecycle, id) = booked().await;
        assert_eq!(lifecycle.transition(id, to(InProgress)).await.unwrap().status, InProgress);
        let done = lifecycle
            .transition(
                id,
                StatusRequest {
                    status: Completed,
                    final_price: Some(Money::from_cents(7250)),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.final_price, Some(Money::from_cents(7250)));
        assert_eq!(lifecycle.get(id).await.unwrap().status, Completed);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let (lifecycle, id) = booked().await;
        lifecycle.transition(id, to(Cancelled)).await.unwrap();
        let error = lifecycle.transition(id, to(Scheduled)).await.unwrap_err();
        assert_eq!(
            error,
            BookingError::InvalidTransition(InvalidTransition {
                from: Cancelled,
                to: Scheduled
            })
        );
    }

    #[tokio::test]
    async fn test_final_price_only_on_completion() {
        let (lifecycle, id) = booked().await;
        let error = lifecycle
            .transition(
                id,
                StatusRequest {
                    status: Cancelled,
                    final_price: Some(Money::ZERO),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, BookingError::Validation(_)));
        assert_eq!(lifecycle.get(id).await.unwrap().status, Scheduled);
    }

    #[tokio::test]
    async fn test_unknown_appointment() {
        let (lifecycle, _) = booked().await;
        let error = lifecycle.get(AppointmentId::new(999)).await.unwrap_err();
        assert!(matches!(error, BookingError::NotFound { entity: "appointment", .. }));
    }

    #[test]
    fn test_status_request_wire_format() {
        let request: StatusRequest =
            serde_json::from_str(r#"{"status":"completed","finalPrice":"72.50"}"#).unwrap();
        assert_eq!(request.status, Completed);
        assert_eq!(request.final_price, Some(Money::from_cents(7250)));
    }
}
