//! Availability calculator.
//!
//! A slot is offered when it lies on the working-hours grid of its day,
//! starts after business-timezone "now", and [`SlotLimits::admits`] one more
//! booking of the requested services given the live appointments already
//! there. Admission re-asks the same question under the slot lock.

use crate::catalog::bookable_services;
use crate::error::{BookingError, ValidationError, ValidationErrors};
use crate::settings::SettingsCache;
use autoshop_core::capacity::SlotLimits;
use autoshop_core::environment::Clock;
use autoshop_core::ids::ServiceId;
use autoshop_core::schedule::{Setting, Slot, SlotLength};
use autoshop_core::store::{AppointmentStore, CatalogStore, OccupiedSlot};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Free slot start times per date. Dates without any free slot are absent.
pub type AvailableSlots = BTreeMap<NaiveDate, Vec<NaiveTime>>;

/// An inclusive range of calendar dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// A range of at most `max_days` days.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] when `to` precedes `from` or
    /// the range is longer than `max_days`.
    pub fn new(from: NaiveDate, to: NaiveDate, max_days: u32) -> Result<Self, ValidationError> {
        if to < from {
            return Err(ValidationError::InvalidRange(
                "must not end before it starts".to_string(),
            ));
        }
        let days = to.signed_duration_since(from).num_days() + 1;
        if days > i64::from(max_days) {
            return Err(ValidationError::InvalidRange(format!(
                "may cover at most {max_days} days"
            )));
        }
        Ok(Self { from, to })
    }

    /// First date.
    #[must_use]
    pub const fn from(&self) -> NaiveDate {
        self.from
    }

    /// Last date.
    #[must_use]
    pub const fn to(&self) -> NaiveDate {
        self.to
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |day| *day <= to)
    }
}

/// Free slots for `range`, from already loaded inputs.
#[must_use]
pub fn compute(
    setting: &Setting,
    slot_length: SlotLength,
    range: DateRange,
    limits: &SlotLimits,
    occupied: &[OccupiedSlot],
    local_now: NaiveDateTime,
) -> AvailableSlots {
    let mut by_slot: BTreeMap<Slot, Vec<&[ServiceId]>> = BTreeMap::new();
    for occupant in occupied {
        by_slot
            .entry(occupant.slot)
            .or_default()
            .push(occupant.service_ids.as_slice());
    }

    let mut available = AvailableSlots::new();
    for date in range.days() {
        let Some(day) = setting.working_day(date) else {
            continue;
        };
        let free: Vec<NaiveTime> = day
            .slot_starts(slot_length)
            .into_iter()
            .filter(|time| {
                let slot = Slot::new(date, *time);
                slot.starts_at() > local_now
                    && limits
                        .admits(by_slot.get(&slot).into_iter().flatten().copied())
                        .is_ok()
            })
            .collect();
        if !free.is_empty() {
            available.insert(date, free);
        }
    }
    available
}

/// Computes free slots against the live stores.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    catalog: Arc<dyn CatalogStore>,
    appointments: Arc<dyn AppointmentStore>,
    settings: Arc<SettingsCache>,
    clock: Arc<dyn Clock>,
    slot_length: SlotLength,
    max_days: u32,
}

impl AvailabilityCalculator {
    /// Calculator over the given stores.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        appointments: Arc<dyn AppointmentStore>,
        settings: Arc<SettingsCache>,
        clock: Arc<dyn Clock>,
        slot_length: SlotLength,
        max_days: u32,
    ) -> Self {
        Self {
            catalog,
            appointments,
            settings,
            clock,
            slot_length,
            max_days,
        }
    }

    /// Free slots between `from` and `to` (inclusive) for a booking of
    /// `service_ids`. An empty selection checks shop capacity only.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a bad range or unknown
    /// services, and [`BookingError::Store`] when a store fails.
    pub async fn get_available_slots(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        service_ids: &[ServiceId],
    ) -> Result<AvailableSlots, BookingError> {
        let mut errors = ValidationErrors::new();
        let range = DateRange::new(from, to, self.max_days)
            .map_err(|error| errors.push(error))
            .ok();

        let catalog = self.catalog.load_catalog().await?;
        let services = bookable_services(&catalog, service_ids, &mut errors);
        let Some(range) = range.filter(|_| errors.is_empty()) else {
            tracing::debug!(errors = errors.len(), "Availability query rejected");
            return Err(errors.into());
        };

        let setting = self.settings.get().await?;
        let limits = SlotLimits::for_services(setting.total_capacity, services);
        let occupied = self.appointments.occupancy(range.from(), range.to()).await?;
        let local_now = setting.local_now(self.clock.now());

        Ok(compute(
            &setting,
            self.slot_length,
            range,
            &limits,
            &occupied,
            local_now,
        ))
    }
}
