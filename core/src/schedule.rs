//! Shop schedule: working hours, capacity and the slot grid.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

/// Day of the week as stored in the working-hours table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl DayOfWeek {
    /// All days, Monday first.
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// The day a calendar date falls on.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `HH:MM` (de)serialization for times of day.
///
/// Input also accepts `HH:MM:SS`; for the optional form an empty string or
/// `null` reads as `None`.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%H:%M";

    /// Parses `HH:MM` or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns the chrono parse error when neither format matches.
    pub fn parse(input: &str) -> Result<NaiveTime, chrono::ParseError> {
        let input = input.trim();
        NaiveTime::parse_from_str(input, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
    }

    /// Serializes as `HH:MM`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    /// Deserializes from `HH:MM` or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Fails on any other format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Optional variant.
    pub mod option {
        use super::{FORMAT, parse};
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer, de};

        /// Serializes `None` as `null`, otherwise `HH:MM`.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.collect_str(&time.format(FORMAT)),
                None => serializer.serialize_none(),
            }
        }

        /// Reads `null`, `""` or a time.
        ///
        /// # Errors
        ///
        /// Fails on a non-empty string that is not a time.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.trim().is_empty() => parse(&raw).map(Some).map_err(de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// Opening hours for one day of the week.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDay {
    /// Day this entry describes
    pub day: DayOfWeek,
    /// Opening time
    #[serde(default, with = "hh_mm::option")]
    pub open: Option<NaiveTime>,
    /// Closing time
    #[serde(default, with = "hh_mm::option")]
    pub close: Option<NaiveTime>,
    /// Closed all day
    #[serde(default)]
    pub is_day_off: bool,
}

impl WorkingDay {
    /// A regular working day.
    #[must_use]
    pub const fn open(day: DayOfWeek, open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            day,
            open: Some(open),
            close: Some(close),
            is_day_off: false,
        }
    }

    /// A day the shop is closed.
    #[must_use]
    pub const fn day_off(day: DayOfWeek) -> Self {
        Self {
            day,
            open: None,
            close: None,
            is_day_off: true,
        }
    }

    /// Opening hours, `None` when the shop is closed that day.
    #[must_use]
    pub fn hours(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.is_day_off, self.open, self.close) {
            (false, Some(open), Some(close)) if open < close => Some((open, close)),
            _ => None,
        }
    }

    /// Slot start times: from `open` in steps of `slot`, while the whole
    /// slot still ends at or before `close`.
    #[must_use]
    pub fn slot_starts(&self, slot: SlotLength) -> Vec<NaiveTime> {
        let Some((open, close)) = self.hours() else {
            return Vec::new();
        };
        let close = minute_of_day(close);
        let step = slot.minutes();
        let mut starts = Vec::new();
        let mut start = minute_of_day(open);
        while start + step <= close {
            if let Some(time) = NaiveTime::from_hms_opt(start / 60, start % 60, 0) {
                starts.push(time);
            }
            start += step;
        }
        starts
    }

    /// Whether `time` is one of this day's slot starts.
    #[must_use]
    pub fn has_slot_at(&self, time: NaiveTime, slot: SlotLength) -> bool {
        let Some((open, close)) = self.hours() else {
            return false;
        };
        let (open, close, at) = (minute_of_day(open), minute_of_day(close), minute_of_day(time));
        time.second() == 0
            && at >= open
            && (at - open) % slot.minutes() == 0
            && at + slot.minutes() <= close
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Fixed slot granularity in minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotLength(NonZeroU32);

impl SlotLength {
    /// One hour.
    pub const HOUR: Self = Self(NonZeroU32::MIN.saturating_add(59));

    /// Slot length from minutes; `None` for zero or anything past a day.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes > 24 * 60 {
            return None;
        }
        match NonZeroU32::new(minutes) {
            Some(minutes) => Some(Self(minutes)),
            None => None,
        }
    }

    /// Length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.0.get()
    }
}

impl Default for SlotLength {
    fn default() -> Self {
        Self::HOUR
    }
}

/// A (date, time) unit of shop capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    /// Calendar date in the business timezone
    pub date: NaiveDate,
    /// Start time in the business timezone
    pub time: NaiveTime,
}

impl Slot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Local start of the slot.
    #[must_use]
    pub const fn starts_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// A key unique per slot, for advisory locks and sharding.
    #[must_use]
    pub fn lock_key(&self) -> i64 {
        i64::from(self.date.num_days_from_ce()) * 1440 + i64::from(minute_of_day(self.time))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time.format("%H:%M"))
    }
}

/// Problems with a shop setting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    /// Capacity must allow at least one appointment
    #[error("total capacity must be at least 1")]
    ZeroCapacity,
    /// Working hours must list each weekday exactly once
    #[error("working hours must list each day of the week exactly once")]
    IncompleteWeek,
    /// A working day closes before (or when) it opens
    #[error("{0}: opening time must be before closing time")]
    InvertedHours(DayOfWeek),
}

/// The shop-wide singleton configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    /// Maximum concurrent appointments per slot, shop-wide
    pub total_capacity: u32,
    /// Business timezone (IANA name)
    pub timezone: Tz,
    /// One entry per weekday
    pub working_hours: Vec<WorkingDay>,
}

impl Setting {
    /// Checks capacity and the working-hours table.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingError`] found.
    pub fn validate(&self) -> Result<(), SettingError> {
        if self.total_capacity == 0 {
            return Err(SettingError::ZeroCapacity);
        }
        let days: BTreeSet<DayOfWeek> = self.working_hours.iter().map(|d| d.day).collect();
        if days.len() != 7 || self.working_hours.len() != 7 {
            return Err(SettingError::IncompleteWeek);
        }
        for day in &self.working_hours {
            if day.is_day_off {
                continue;
            }
            match (day.open, day.close) {
                (Some(open), Some(close)) if open < close => {}
                _ => return Err(SettingError::InvertedHours(day.day)),
            }
        }
        Ok(())
    }

    /// The working-hours entry for a date, if any.
    #[must_use]
    pub fn working_day(&self, date: NaiveDate) -> Option<&WorkingDay> {
        let day = DayOfWeek::of(date);
        self.working_hours.iter().find(|d| d.day == day)
    }

    /// Whether `slot` lies on the grid inside the working hours of its day.
    #[must_use]
    pub fn is_bookable(&self, slot: Slot, length: SlotLength) -> bool {
        self.working_day(slot.date)
            .is_some_and(|day| day.has_slot_at(slot.time, length))
    }

    /// Wall-clock "now" in the business timezone.
    #[must_use]
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.timezone).naive_local()
    }
}
