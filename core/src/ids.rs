//! Strongly-typed identifiers.
//!
//! Every entity is keyed by a database-assigned `i64`; the newtypes keep a
//! `ServiceId` from being passed where an `AppointmentId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a service category.
    CategoryId
);
define_id!(
    /// Identifier of a bookable service.
    ServiceId
);
define_id!(
    /// Identifier of a per-service requirement.
    RequirementId
);
define_id!(
    /// Identifier of an appointment.
    AppointmentId
);
define_id!(
    /// Identifier of a customer.
    CustomerId
);
define_id!(
    /// Identifier of a customer's vehicle.
    VehicleId
);
define_id!(
    /// Identifier of a staff user.
    UserId
);
