//! Storage abstractions for the booking engine.
//!
//! # Implementations
//!
//! - `autoshop-postgres`: production stores on `PostgreSQL`
//! - `autoshop-testing`: in-memory stores for tests and the demo server
//!
//! # Capacity
//!
//! [`AppointmentStore::admit`] is the one place where shared capacity is
//! mutated. Implementations must serialize admissions per slot so that the
//! [`SlotLimits`] check and the insert happen as a unit: two concurrent
//! admissions can never both take the last unit of a slot.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] rather than using `async fn` so the stores can
//! be shared as `Arc<dyn AppointmentStore>` and friends.

use crate::appointment::{Appointment, InvalidTransition, NewAppointment, StatusChange};
use crate::capacity::{CapacityExceeded, SlotLimits};
use crate::catalog::Catalog;
use crate::customer::{Customer, CustomerDetails, StaffUser, Vehicle, VehicleDetails};
use crate::ids::{AppointmentId, CustomerId, ServiceId, UserId};
use crate::schedule::{Setting, Slot};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Boxed, sendable future returned by the store traits.
pub use futures::future::BoxFuture;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind ("appointment", "user", ...)
        entity: &'static str,
        /// Requested identifier
        id: String,
    },

    /// Admission refused: the slot has no room left.
    #[error("capacity exceeded at {slot}: {reason}")]
    CapacityExceeded {
        /// The contested slot
        slot: Slot,
        /// Which limit was hit
        reason: CapacityExceeded,
    },

    /// Status change refused by the lifecycle graph.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// A uniqueness or consistency constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A live appointment holding a slot, as seen by capacity checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupiedSlot {
    /// The held slot
    pub slot: Slot,
    /// Services of the appointment holding it
    pub service_ids: Vec<ServiceId>,
}

/// Read access to the service catalog.
pub trait CatalogStore: Send + Sync {
    /// Loads a validated snapshot of the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when stored rows violate catalog
    /// invariants, or [`StoreError::Database`] on I/O failure.
    fn load_catalog(&self) -> BoxFuture<'_, Result<Catalog, StoreError>>;
}

/// The shop setting singleton.
pub trait SettingsStore: Send + Sync {
    /// Loads the setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no setting exists yet.
    fn load_setting(&self) -> BoxFuture<'_, Result<Setting, StoreError>>;

    /// Replaces the setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on I/O failure.
    fn save_setting(&self, setting: Setting) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Appointment persistence and the capacity critical section.
pub trait AppointmentStore: Send + Sync {
    /// Re-checks `limits` against the live appointments at the slot and, if
    /// the booking fits, inserts it, all under one per-slot lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CapacityExceeded`] when the slot is full.
    fn admit(
        &self,
        appointment: NewAppointment,
        limits: SlotLimits,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>>;

    /// Live (non-cancelled) appointments with a date in `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on I/O failure.
    fn occupancy(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<OccupiedSlot>, StoreError>>;

    /// Loads one appointment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn get(&self, id: AppointmentId) -> BoxFuture<'_, Result<Appointment, StoreError>>;

    /// Applies a status change atomically with respect to admissions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::InvalidTransition`] when the lifecycle forbids the move.
    fn transition(
        &self,
        id: AppointmentId,
        change: StatusChange,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>>;
}

/// Customer and vehicle records.
pub trait CustomerStore: Send + Sync {
    /// Finds the customer by e-mail (case-insensitive) and refreshes their
    /// details, or creates a new one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on I/O failure.
    fn resolve_customer(
        &self,
        details: CustomerDetails,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Customer, StoreError>>;

    /// Finds the customer's vehicle (see [`VehicleDetails::identifies`]) and
    /// refreshes its tire size, or creates it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on I/O failure.
    fn resolve_vehicle(
        &self,
        customer_id: CustomerId,
        details: VehicleDetails,
    ) -> BoxFuture<'_, Result<Vehicle, StoreError>>;
}

/// Staff users and the single mail-recipient flag.
pub trait StaffStore: Send + Sync {
    /// Makes `user_id` the only user with `receive_mail` set, clearing the
    /// flag everywhere else in the same locked operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown user.
    fn assign_mail_recipient(&self, user_id: UserId) -> BoxFuture<'_, Result<StaffUser, StoreError>>;

    /// The current mail recipient, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on I/O failure.
    fn mail_recipient(&self) -> BoxFuture<'_, Result<Option<StaffUser>, StoreError>>;
}
