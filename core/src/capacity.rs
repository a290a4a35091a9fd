//! Pure capacity rules for one slot.
//!
//! Both the availability read path and the admission critical section ask the
//! same question through [`SlotLimits::admits`]: given the live appointments
//! already holding a slot, does one more booking of these services fit?

use crate::catalog::Service;
use crate::ids::ServiceId;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a slot cannot take another booking.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "limit", rename_all = "snake_case")]
pub enum CapacityExceeded {
    /// The shop-wide capacity is used up
    #[error("slot is full ({booked}/{capacity} appointments)")]
    Shop {
        /// Shop-wide capacity
        capacity: u32,
        /// Live appointments at the slot
        booked: u32,
    },
    /// A requested service hit its own cap
    #[error("service {service_id} is fully booked for this slot ({booked}/{cap})")]
    Service {
        /// Capped service
        service_id: ServiceId,
        /// Per-slot cap of the service
        cap: u32,
        /// Live appointments at the slot including the service
        booked: u32,
    },
}

/// Capacity limits that apply to a booking of a given service selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotLimits {
    total_capacity: u32,
    service_caps: BTreeMap<ServiceId, u32>,
}

impl SlotLimits {
    /// Limits with only the shop-wide capacity.
    #[must_use]
    pub const fn new(total_capacity: u32) -> Self {
        Self {
            total_capacity,
            service_caps: BTreeMap::new(),
        }
    }

    /// Adds a per-service cap.
    #[must_use]
    pub fn with_service_cap(mut self, service_id: ServiceId, cap: u32) -> Self {
        self.service_caps.insert(service_id, cap);
        self
    }

    /// Limits for booking `services`: shop capacity plus each service's own cap.
    #[must_use]
    pub fn for_services<'a>(
        total_capacity: u32,
        services: impl IntoIterator<Item = &'a Service>,
    ) -> Self {
        services
            .into_iter()
            .fold(Self::new(total_capacity), |limits, service| {
                match service.max_concurrent_bookings {
                    Some(cap) => limits.with_service_cap(service.id, cap.get()),
                    None => limits,
                }
            })
    }

    /// Checks whether one more appointment fits, given the service sets of
    /// the live appointments already at the slot.
    ///
    /// An appointment counts once toward the shop capacity however many
    /// services it carries.
    ///
    /// # Errors
    ///
    /// Returns the first limit that is already reached.
    pub fn admits<'a, I>(&self, occupants: I) -> Result<(), CapacityExceeded>
    where
        I: IntoIterator<Item = &'a [ServiceId]>,
    {
        let mut booked = 0u32;
        let mut per_service: BTreeMap<ServiceId, u32> = BTreeMap::new();
        for services in occupants {
            booked = booked.saturating_add(1);
            for service_id in self.service_caps.keys() {
                if services.contains(service_id) {
                    *per_service.entry(*service_id).or_insert(0) += 1;
                }
            }
        }

        if booked >= self.total_capacity {
            return Err(CapacityExceeded::Shop {
                capacity: self.total_capacity,
                booked,
            });
        }
        for (service_id, cap) in &self.service_caps {
            let booked = per_service.get(service_id).copied().unwrap_or(0);
            if booked >= *cap {
                return Err(CapacityExceeded::Service {
                    service_id: *service_id,
                    cap: *cap,
                    booked,
                });
            }
        }
        Ok(())
    }
}
