//! In-memory implementations of the storage traits.
//!
//! Each store keeps its state behind one `std::sync::Mutex`. Admission runs
//! its capacity check and insert under that lock, which gives the same
//! per-slot serialization the database store gets from its advisory lock.

use autoshop_core::appointment::{Appointment, NewAppointment, StatusChange};
use autoshop_core::capacity::SlotLimits;
use autoshop_core::catalog::{Catalog, CatalogError};
use autoshop_core::customer::{Customer, CustomerDetails, StaffUser, Vehicle, VehicleDetails};
use autoshop_core::ids::{AppointmentId, CustomerId, UserId, VehicleId};
use autoshop_core::schedule::Setting;
use autoshop_core::store::{
    AppointmentStore, BoxFuture, CatalogStore, CustomerStore, OccupiedSlot, SettingsStore,
    StaffStore, StoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog held in memory.
#[derive(Debug)]
pub struct InMemoryCatalogStore {
    catalog: Mutex<Catalog>,
    loads: AtomicUsize,
}

impl InMemoryCatalogStore {
    /// Store serving `catalog`.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            loads: AtomicUsize::new(0),
        }
    }

    /// Store serving the demo catalog.
    ///
    /// # Errors
    ///
    /// Propagates [`CatalogError`] from the fixtures.
    pub fn demo() -> Result<Self, CatalogError> {
        crate::fixtures::catalog().map(Self::new)
    }

    /// Number of `load_catalog` calls so far.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load_catalog(&self) -> BoxFuture<'_, Result<Catalog, StoreError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.catalog).clone())
        })
    }
}

/// Setting singleton held in memory, counting loads so tests can observe
/// caching.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    setting: Mutex<Option<Setting>>,
    loads: AtomicUsize,
}

impl InMemorySettingsStore {
    /// Store holding `setting`.
    #[must_use]
    pub fn new(setting: Setting) -> Self {
        Self {
            setting: Mutex::new(Some(setting)),
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of `load_setting` calls so far.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Writes behind the back of any cache (simulates another process).
    pub fn overwrite(&self, setting: Setting) {
        *lock(&self.setting) = Some(setting);
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load_setting(&self) -> BoxFuture<'_, Result<Setting, StoreError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            lock(&self.setting)
                .clone()
                .ok_or_else(|| StoreError::not_found("setting", "singleton"))
        })
    }

    fn save_setting(&self, setting: Setting) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            *lock(&self.setting) = Some(setting);
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
struct AppointmentTable {
    rows: BTreeMap<AppointmentId, Appointment>,
    next_id: i64,
}

/// Appointments held in memory.
///
/// [`set_unavailable`](Self::set_unavailable) makes every call fail with
/// [`StoreError::Database`], for exercising outage handling.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    table: Mutex<AppointmentTable>,
    unavailable: AtomicBool,
}

impl InMemoryAppointmentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All stored appointments, by id.
    #[must_use]
    pub fn all(&self) -> Vec<Appointment> {
        lock(&self.table).rows.values().cloned().collect()
    }

    /// Number of stored appointments.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.table).rows.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("appointment store unavailable".to_string()));
        }
        Ok(())
    }
}

impl AppointmentStore for InMemoryAppointmentStore {
    fn admit(
        &self,
        appointment: NewAppointment,
        limits: SlotLimits,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let mut table = lock(&self.table);
            let slot = appointment.slot;
            let occupants = table
                .rows
                .values()
                .filter(|a| a.occupies_capacity() && a.slot() == slot)
                .map(|a| a.service_ids.as_slice());
            limits
                .admits(occupants)
                .map_err(|reason| StoreError::CapacityExceeded { slot, reason })?;

            table.next_id += 1;
            let stored = appointment.into_appointment(AppointmentId::new(table.next_id));
            table.rows.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    fn occupancy(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<OccupiedSlot>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(lock(&self.table)
                .rows
                .values()
                .filter(|a| a.occupies_capacity() && (from..=to).contains(&a.appointment_date))
                .map(|a| OccupiedSlot {
                    slot: a.slot(),
                    service_ids: a.service_ids.clone(),
                })
                .collect())
        })
    }

    fn get(&self, id: AppointmentId) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            lock(&self.table)
                .rows
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("appointment", id))
        })
    }

    fn transition(
        &self,
        id: AppointmentId,
        change: StatusChange,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let mut table = lock(&self.table);
            let current = table
                .rows
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("appointment", id))?;
            let updated = change.apply(current)?;
            table.rows.insert(id, updated.clone());
            Ok(updated)
        })
    }
}

#[derive(Debug, Default)]
struct CustomerTable {
    customers: BTreeMap<CustomerId, Customer>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_customer: i64,
    next_vehicle: i64,
}

/// Customers and vehicles held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    table: Mutex<CustomerTable>,
}

impl InMemoryCustomerStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All customers.
    #[must_use]
    pub fn customers(&self) -> Vec<Customer> {
        lock(&self.table).customers.values().cloned().collect()
    }

    /// All vehicles.
    #[must_use]
    pub fn vehicles(&self) -> Vec<Vehicle> {
        lock(&self.table).vehicles.values().cloned().collect()
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn resolve_customer(
        &self,
        details: CustomerDetails,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Customer, StoreError>> {
        Box::pin(async move {
            let mut table = lock(&self.table);
            if let Some(existing) = table
                .customers
                .values_mut()
                .find(|c| c.has_email(&details.email))
            {
                existing.details = details;
                existing.updated_at = at;
                return Ok(existing.clone());
            }

            table.next_customer += 1;
            let customer = Customer {
                id: CustomerId::new(table.next_customer),
                details,
                created_at: at,
                updated_at: at,
            };
            table.customers.insert(customer.id, customer.clone());
            Ok(customer)
        })
    }

    fn resolve_vehicle(
        &self,
        customer_id: CustomerId,
        details: VehicleDetails,
    ) -> BoxFuture<'_, Result<Vehicle, StoreError>> {
        Box::pin(async move {
            let mut table = lock(&self.table);
            if let Some(existing) = table
                .vehicles
                .values_mut()
                .find(|v| v.customer_id == customer_id && details.identifies(&v.details))
            {
                existing.details.tire_size = details.tire_size;
                return Ok(existing.clone());
            }

            table.next_vehicle += 1;
            let vehicle = Vehicle {
                id: VehicleId::new(table.next_vehicle),
                customer_id,
                details,
            };
            table.vehicles.insert(vehicle.id, vehicle.clone());
            Ok(vehicle)
        })
    }
}

/// Staff users held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStaffStore {
    users: Mutex<BTreeMap<UserId, StaffUser>>,
}

impl InMemoryStaffStore {
    /// Store holding `users`.
    #[must_use]
    pub fn new(users: Vec<StaffUser>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// All users, by id.
    #[must_use]
    pub fn users(&self) -> Vec<StaffUser> {
        lock(&self.users).values().cloned().collect()
    }
}

impl StaffStore for InMemoryStaffStore {
    fn assign_mail_recipient(&self, user_id: UserId) -> BoxFuture<'_, Result<StaffUser, StoreError>> {
        Box::pin(async move {
            let mut users = lock(&self.users);
            if !users.contains_key(&user_id) {
                return Err(StoreError::not_found("user", user_id));
            }
            for user in users.values_mut() {
                user.receive_mail = user.id == user_id;
            }
            users
                .get(&user_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("user", user_id))
        })
    }

    fn mail_recipient(&self) -> BoxFuture<'_, Result<Option<StaffUser>, StoreError>> {
        Box::pin(async move { Ok(lock(&self.users).values().find(|u| u.receive_mail).cloned()) })
    }
}
