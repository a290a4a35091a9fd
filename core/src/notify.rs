//! Outbound booking notifications.
//!
//! The engine hands a [`BookingAdmitted`] record to a [`BookingNotifier`]
//! after the appointment is committed. Delivery (mail, SMS, ...) lives behind
//! the trait.

use crate::appointment::Appointment;
use crate::customer::{Customer, StaffUser, Vehicle};
use crate::ids::ServiceId;
use crate::pricing::PriceQuote;
use crate::store::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a booked service, for rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedService {
    /// Service identifier
    pub id: ServiceId,
    /// Display name
    pub name: String,
}

/// Everything a notification needs about a freshly admitted booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAdmitted {
    /// The committed appointment
    pub appointment: Appointment,
    /// Booking customer
    pub customer: Customer,
    /// Serviced vehicle
    pub vehicle: Vehicle,
    /// Booked services, in request order
    pub services: Vec<BookedService>,
    /// Price breakdown at booking time
    pub quote: PriceQuote,
}

/// Notification delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport rejected or dropped the message
    #[error("delivery failed: {0}")]
    Delivery(String),
    /// The message could not be rendered
    #[error("rendering failed: {0}")]
    Render(String),
}

/// Delivers booking notifications to the customer and the shop.
pub trait BookingNotifier: Send + Sync {
    /// Sends the booking confirmation to the customer.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails.
    fn send_customer_confirmation<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;

    /// Sends the new-booking notice to the staff mail recipient.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails.
    fn send_admin_notification<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
        recipient: &'a StaffUser,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;
}
