//! # Autoshop Core
//!
//! Domain model and storage abstractions for the auto-service booking engine.
//!
//! This crate holds everything the engine needs that does not depend on a
//! particular database or transport:
//!
//! - [`money`]: fixed-point `Money` and `Quantity`
//! - [`catalog`]: services, categories and typed requirements
//! - [`schedule`]: working hours, the slot grid and the shop `Setting`
//! - [`capacity`]: the pure per-slot capacity rule shared by reads and writes
//! - [`appointment`]: appointments and the status lifecycle
//! - [`store`]: dyn-compatible storage traits
//! - [`notify`]: the outbound booking notification seam
//! - [`environment`]: injected dependencies such as the clock

pub mod appointment;
pub mod capacity;
pub mod catalog;
pub mod customer;
pub mod ids;
pub mod money;
pub mod notify;
pub mod pricing;
pub mod schedule;
pub mod store;

/// Environment module - injected dependencies.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at));
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use appointment::{Appointment, AppointmentStatus, InvalidTransition};
pub use capacity::{CapacityExceeded, SlotLimits};
pub use catalog::{Catalog, Service, ServiceRequirement};
pub use money::Money;
pub use schedule::{Setting, Slot, SlotLength};
pub use store::StoreError;
