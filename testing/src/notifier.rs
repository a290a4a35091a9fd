//! Notifier double that records deliveries and can fail on demand.

use autoshop_core::customer::StaffUser;
use autoshop_core::ids::AppointmentId;
use autoshop_core::notify::{BookingAdmitted, BookingNotifier, NotifyError};
use autoshop_core::store::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Who a notification went to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// The booking customer, by e-mail
    Customer(String),
    /// The staff mail recipient, by e-mail
    Admin(String),
}

/// A successful delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Target of the message
    pub recipient: Recipient,
    /// Appointment the message is about
    pub appointment_id: AppointmentId,
}

/// Records every delivery. Configured with [`failing_first`](Self::failing_first),
/// the first `n` attempts fail with [`NotifyError::Delivery`].
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    /// Notifier that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose first `n` attempts fail.
    #[must_use]
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Successful deliveries, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attempts so far, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, recipient: Recipient, booking: &BookingAdmitted) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(NotifyError::Delivery("simulated outage".to_string()));
        }
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                recipient,
                appointment_id: booking.appointment.id,
            });
        Ok(())
    }
}

impl BookingNotifier for RecordingNotifier {
    fn send_customer_confirmation<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            self.record(Recipient::Customer(booking.customer.details.email.clone()), booking)
        })
    }

    fn send_admin_notification<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
        recipient: &'a StaffUser,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move { self.record(Recipient::Admin(recipient.email.clone()), booking) })
    }
}
