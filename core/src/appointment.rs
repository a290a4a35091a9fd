//! Appointments and their status lifecycle.
//!
//! ```text
//! scheduled ──► in_progress ──► completed
//!     │              │
//!     ├──► cancelled └──► no_show
//!     └──► no_show
//! ```
//!
//! [`transition`] is the only function that changes an appointment's status.

use crate::ids::{AppointmentId, CustomerId, ServiceId, VehicleId};
use crate::money::Money;
use crate::schedule::{Slot, hh_mm};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Answers to one service's requirements, keyed by requirement key.
pub type Answers = BTreeMap<String, serde_json::Value>;

/// Where an appointment is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked, not started (initial)
    Scheduled,
    /// Vehicle is in the shop
    InProgress,
    /// Work finished (terminal)
    Completed,
    /// Called off before starting (terminal)
    Cancelled,
    /// Customer never showed up (terminal)
    NoShow,
}

impl AppointmentStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Everything except a cancellation holds a capacity unit.
    #[must_use]
    pub const fn occupies_capacity(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether the lifecycle graph has an edge `self -> to`.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Scheduled, Self::InProgress | Self::Cancelled | Self::NoShow)
                | (Self::InProgress, Self::Completed | Self::NoShow)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown appointment status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status change the lifecycle graph does not allow.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[error("cannot move appointment from {from} to {to}")]
pub struct InvalidTransition {
    /// Current status
    pub from: AppointmentStatus,
    /// Requested status
    pub to: AppointmentStatus,
}

/// A committed booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Appointment identifier
    pub id: AppointmentId,
    /// Booking customer
    pub customer_id: CustomerId,
    /// Vehicle being serviced
    pub vehicle_id: VehicleId,
    /// Booked services (one capacity unit in total)
    pub service_ids: Vec<ServiceId>,
    /// Date in the business timezone
    pub appointment_date: NaiveDate,
    /// Slot start in the business timezone
    #[serde(with = "hh_mm")]
    pub appointment_time: NaiveTime,
    /// Lifecycle status
    pub status: AppointmentStatus,
    /// Price quoted at booking time
    pub estimated_price: Money,
    /// Price charged, set on completion
    pub final_price: Option<Money>,
    /// Free-form customer notes
    pub notes: Option<String>,
    /// Requirement answers per service
    #[serde(default)]
    pub service_requirements: BTreeMap<ServiceId, Answers>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The capacity slot this appointment holds.
    #[must_use]
    pub const fn slot(&self) -> Slot {
        Slot::new(self.appointment_date, self.appointment_time)
    }

    /// Whether it currently holds a capacity unit.
    #[must_use]
    pub const fn occupies_capacity(&self) -> bool {
        self.status.occupies_capacity()
    }
}

/// An admitted booking about to be written; the store assigns the id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAppointment {
    /// Booking customer
    pub customer_id: CustomerId,
    /// Vehicle being serviced
    pub vehicle_id: VehicleId,
    /// Booked services
    pub service_ids: Vec<ServiceId>,
    /// Requested slot
    pub slot: Slot,
    /// Quoted total
    pub estimated_price: Money,
    /// Customer notes
    pub notes: Option<String>,
    /// Requirement answers per service
    pub service_requirements: BTreeMap<ServiceId, Answers>,
    /// Admission time, used for both timestamps
    pub requested_at: DateTime<Utc>,
}

impl NewAppointment {
    /// The stored appointment, in its initial status.
    #[must_use]
    pub fn into_appointment(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            customer_id: self.customer_id,
            vehicle_id: self.vehicle_id,
            service_ids: self.service_ids,
            appointment_date: self.slot.date,
            appointment_time: self.slot.time,
            status: AppointmentStatus::Scheduled,
            estimated_price: self.estimated_price,
            final_price: None,
            notes: self.notes,
            service_requirements: self.service_requirements,
            created_at: self.requested_at,
            updated_at: self.requested_at,
        }
    }
}

/// Moves an appointment along the lifecycle graph.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the graph has no such edge, which
/// includes every move out of a terminal status.
pub fn transition(
    mut appointment: Appointment,
    to: AppointmentStatus,
    at: DateTime<Utc>,
) -> Result<Appointment, InvalidTransition> {
    let from = appointment.status;
    if !from.can_transition_to(to) {
        return Err(InvalidTransition { from, to });
    }
    appointment.status = to;
    appointment.updated_at = at;
    Ok(appointment)
}

/// An admin-requested status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// Target status
    pub to: AppointmentStatus,
    /// Charged price, only meaningful when completing
    pub final_price: Option<Money>,
    /// When the change happens
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// Applies the change through [`transition`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the graph forbids the move.
    pub fn apply(&self, appointment: Appointment) -> Result<Appointment, InvalidTransition> {
        let mut appointment = transition(appointment, self.to, self.at)?;
        if self.to == AppointmentStatus::Completed && self.final_price.is_some() {
            appointment.final_price = self.final_price;
        }
        Ok(appointment)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use AppointmentStatus::{Cancelled, Completed, InProgress, NoShow, Scheduled};

    const ALL: [AppointmentStatus; 5] = [Scheduled, InProgress, Completed, Cancelled, NoShow];

    fn appointment(status: AppointmentStatus) -> Appointment {
        let at = DateTime::parse_from_rfc3339("2024-06-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        NewAppointment {
            customer_id: CustomerId::new(1),
            vehicle_id: VehicleId::new(1),
            service_ids: vec![ServiceId::new(1)],
            slot: Slot::new(
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ),
            estimated_price: Money::from_cents(4500),
            notes: None,
            service_requirements: BTreeMap::new(),
            requested_at: at,
        }
        .into_appointment(AppointmentId::new(1))
        .with_status(status)
    }

    impl Appointment {
        fn with_status(mut self, status: AppointmentStatus) -> Self {
            self.status = status;
            self
        }
    }

    #[test]
    fn test_lifecycle_graph() {
        let allowed = [
            (Scheduled, InProgress),
            (Scheduled, Cancelled),
            (Scheduled, NoShow),
            (InProgress, Completed),
            (InProgress, NoShow),
        ];
        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                let at = Utc::now();
                let result = transition(appointment(from), to, at);
                assert_eq!(result.is_ok(), expected, "{from} -> {to}");
                if let Ok(moved) = result {
                    assert_eq!(moved.status, to);
                    assert_eq!(moved.updated_at, at);
                } else {
                    assert_eq!(result, Err(InvalidTransition { from, to }));
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in ALL.into_iter().filter(AppointmentStatus::is_terminal) {
            assert!(ALL.iter().all(|to| !status.can_transition_to(*to)));
        }
    }

    #[test]
    fn test_final_price_only_recorded_on_completion() {
        let change = StatusChange {
            to: Completed,
            final_price: Some(Money::from_cents(7250)),
            at: Utc::now(),
        };
        let done = change.apply(appointment(InProgress)).unwrap();
        assert_eq!(done.final_price, Some(Money::from_cents(7250)));

        let started = StatusChange { to: InProgress, ..change }
            .apply(appointment(Scheduled))
            .unwrap();
        assert_eq!(started.final_price, None);
    }

    #[test]
    fn test_status_wire_names_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
        assert!("done".parse::<AppointmentStatus>().is_err());
    }
}
