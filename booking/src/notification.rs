//! Booking notification dispatch.
//!
//! After an appointment is committed, [`NotificationDispatcher::dispatch`]
//! spawns a detached task that sends the customer confirmation, then the
//! admin notification to the staff mail recipient. Each delivery is retried
//! with exponential backoff. Failures are logged and counted and never reach
//! the booking caller.

use crate::metrics;
use autoshop_core::customer::StaffUser;
use autoshop_core::ids::AppointmentId;
use autoshop_core::notify::{BookingAdmitted, BookingNotifier, NotifyError};
use autoshop_core::store::{BoxFuture, StaffStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 200ms
/// - `max_delay`: 5 seconds
/// - `multiplier`: 2 (delay doubles each retry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
        }
    }

    /// Calculate delay for a given attempt number.
    ///
    /// `initial_delay * multiplier ^ attempt`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.multiplier
            .checked_pow(attempt)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub const fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// Returns the first success, or the last error once `max_retries` retries
/// have failed.
///
/// # Errors
///
/// Returns the operation's last error when every attempt fails.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= policy.max_retries {
                    tracing::error!(attempt, error = %err, "Operation failed after max retries");
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Operation failed, retrying..."
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Hands committed bookings to a [`BookingNotifier`] in the background.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn BookingNotifier>,
    staff: Arc<dyn StaffStore>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    /// Dispatcher delivering through `notifier`, resolving the admin target
    /// through `staff`.
    #[must_use]
    pub fn new(notifier: Arc<dyn BookingNotifier>, staff: Arc<dyn StaffStore>, policy: RetryPolicy) -> Self {
        Self {
            notifier,
            staff,
            policy,
        }
    }

    /// Spawns delivery of both notifications. Dropping the handle detaches
    /// the task.
    pub fn dispatch(&self, booking: BookingAdmitted) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.deliver(&booking).await })
    }

    async fn deliver(&self, booking: &BookingAdmitted) {
        let appointment_id = booking.appointment.id;

        let sent = retry_with_backoff(&self.policy, || {
            self.notifier.send_customer_confirmation(booking)
        })
        .await;
        record_outcome("customer", appointment_id, sent);

        match self.staff.mail_recipient().await {
            Ok(Some(recipient)) => {
                let sent = retry_with_backoff(&self.policy, || {
                    self.notifier.send_admin_notification(booking, &recipient)
                })
                .await;
                record_outcome("admin", appointment_id, sent);
            }
            Ok(None) => {
                tracing::warn!(%appointment_id, "No staff mail recipient; admin notification skipped");
                metrics::record_notification("admin", "skipped");
            }
            Err(error) => {
                tracing::warn!(%appointment_id, %error, "Mail recipient lookup failed");
                metrics::record_notification("admin", "failed");
            }
        }
    }
}

fn record_outcome(target: &'static str, appointment_id: AppointmentId, sent: Result<(), NotifyError>) {
    match sent {
        Ok(()) => {
            tracing::debug!(%appointment_id, recipient = target, "Notification sent");
            metrics::record_notification(target, "sent");
        }
        Err(error) => {
            tracing::warn!(%appointment_id, recipient = target, %error, "Notification failed");
            metrics::record_notification(target, "failed");
        }
    }
}

/// Renders booking mails into the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Subject and body of the customer confirmation.
    #[must_use]
    pub fn render_confirmation(booking: &BookingAdmitted) -> (String, String) {
        let appointment = &booking.appointment;
        let subject = format!("Your appointment on {} is confirmed", appointment.slot());
        let mut body = format!("Hello {},\n\n", booking.customer.details.full_name);
        body.push_str(&format!("We will see you on {}.\n\n", appointment.slot()));
        body.push_str(&Self::summary(booking));
        (subject, body)
    }

    /// Subject and body of the staff notice.
    #[must_use]
    pub fn render_admin(booking: &BookingAdmitted) -> (String, String) {
        let customer = &booking.customer.details;
        let subject = format!("New booking #{} for {}", booking.appointment.id, booking.appointment.slot());
        let mut body = format!("{} <{}>, {}\n\n", customer.full_name, customer.email, customer.phone);
        body.push_str(&Self::summary(booking));
        (subject, body)
    }

    fn summary(booking: &BookingAdmitted) -> String {
        let vehicle = &booking.vehicle.details;
        let mut text = format!(
            "Vehicle: {} {} {} ({})\nServices:\n",
            vehicle.year, vehicle.make, vehicle.model, vehicle.vehicle_type
        );
        for service in &booking.services {
            text.push_str(&format!("  - {}\n", service.name));
        }
        for addon in &booking.quote.addons {
            text.push_str(&format!("  + {} ({})\n", addon.label, addon.amount));
        }
        text.push_str(&format!("Estimated total: ${}", booking.quote.total));
        if booking.quote.quote_required {
            text.push_str(" (some services are quoted on site)");
        }
        text
    }
}

impl BookingNotifier for ConsoleNotifier {
    fn send_customer_confirmation<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let (subject, body) = Self::render_confirmation(booking);
            tracing::info!(to = %booking.customer.details.email, %subject, %body, "Customer confirmation");
            Ok(())
        })
    }

    fn send_admin_notification<'a>(
        &'a self,
        booking: &'a BookingAdmitted,
        recipient: &'a StaffUser,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let (subject, body) = Self::render_admin(booking);
            tracing::info!(to = %recipient.email, %subject, %body, "Admin notification");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use autoshop_core::appointment::NewAppointment;
    use autoshop_core::customer::{Customer, CustomerDetails, Vehicle, VehicleDetails};
    use autoshop_core::ids::{CustomerId, VehicleId};
    use autoshop_core::money::Money;
    use autoshop_core::notify::BookedService;
    use autoshop_core::pricing::PriceQuote;
    use autoshop_core::schedule::Slot;
    use autoshop_testing::fixtures::{self, OIL_CHANGE};
    use autoshop_testing::notifier::{Recipient, RecordingNotifier};
    use autoshop_testing::stores::InMemoryStaffStore;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn booking() -> BookingAdmitted {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let slot = Slot::new(
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        );
        BookingAdmitted {
            appointment: NewAppointment {
                customer_id: CustomerId::new(1),
                vehicle_id: VehicleId::new(1),
                service_ids: vec![OIL_CHANGE],
                slot,
                estimated_price: Money::from_cents(4500),
                notes: None,
                service_requirements: BTreeMap::new(),
                requested_at: at,
            }
            .into_appointment(AppointmentId::new(7)),
            customer: Customer {
                id: CustomerId::new(1),
                details: CustomerDetails {
                    full_name: "Jordan Lee".to_string(),
                    phone: "555-0100".to_string(),
                    email: "jordan@example.com".to_string(),
                    sms_updates: false,
                },
                created_at: at,
                updated_at: at,
            },
            vehicle: Vehicle {
                id: VehicleId::new(1),
                customer_id: CustomerId::new(1),
                details: VehicleDetails {
                    vehicle_type: "sedan".to_string(),
                    make: "Honda".to_string(),
                    model: "Civic".to_string(),
                    year: 2019,
                    vin: None,
                    tire_size: None,
                },
            },
            services: vec![BookedService {
                id: OIL_CHANGE,
                name: "Oil Change".to_string(),
            }],
            quote: PriceQuote::new(Money::from_cents(4500), vec![], false),
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(1))
            .build()
    }

    #[test]
    fn test_retry_policy_delay_calculation() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(1))
            .multiplier(2)
            .build();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), String> = retry_with_backoff(&fast(), || {
            calls += 1;
            async { Err("down".to_string()) }
        })
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_delivers_to_customer_and_mail_recipient() {
        let notifier = Arc::new(RecordingNotifier::failing_first(1));
        let staff = Arc::new(InMemoryStaffStore::new(fixtures::staff()));
        let dispatcher = NotificationDispatcher::new(notifier.clone(), staff, fast());

        dispatcher.dispatch(booking()).await.unwrap();

        let recipients: Vec<_> = notifier.deliveries().into_iter().map(|d| d.recipient).collect();
        assert_eq!(
            recipients,
            [
                Recipient::Customer("jordan@example.com".to_string()),
                Recipient::Admin("alex@autoshop.test".to_string()),
            ]
        );
        assert_eq!(notifier.attempts(), 3);
    }

    #[tokio::test]
    async fn test_failures_stay_inside_the_task() {
        let notifier = Arc::new(RecordingNotifier::failing_first(usize::MAX));
        let staff = Arc::new(InMemoryStaffStore::new(fixtures::staff()));
        let dispatcher = NotificationDispatcher::new(notifier.clone(), staff, fast());

        assert!(dispatcher.dispatch(booking()).await.is_ok());
        assert!(notifier.deliveries().is_empty());
        assert_eq!(notifier.attempts(), 6);
    }

    #[tokio::test]
    async fn test_admin_skipped_without_recipient() {
        let notifier = Arc::new(RecordingNotifier::new());
        let staff = Arc::new(InMemoryStaffStore::new(Vec::new()));
        let dispatcher = NotificationDispatcher::new(notifier.clone(), staff, fast());

        dispatcher.dispatch(booking()).await.unwrap();
        assert_eq!(notifier.deliveries().len(), 1);
    }

    #[test]
    fn test_console_rendering() {
        let (subject, body) = ConsoleNotifier::render_confirmation(&booking());
        assert_eq!(subject, "Your appointment on 2024-06-10 09:00 is confirmed");
        assert!(body.contains("  - Oil Change"));
        assert!(body.ends_with("Estimated total: $45.00"));

        let (subject, _) = ConsoleNotifier::render_admin(&booking());
        assert_eq!(subject, "New booking #7 for 2024-06-10 09:00");
    }
}
