//! Customers, their vehicles and staff users.

use crate::ids::{CustomerId, UserId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact details submitted with a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    /// Full name
    pub full_name: String,
    /// Phone number
    pub phone: String,
    /// E-mail address, the customer's identity
    pub email: String,
    /// Opted in to SMS updates
    #[serde(default)]
    pub sms_updates: bool,
}

/// A stored customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Customer identifier
    pub id: CustomerId,
    /// Contact details, refreshed on each booking
    #[serde(flatten)]
    pub details: CustomerDetails,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Whether `email` identifies this customer (case-insensitive).
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        self.details.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Vehicle details submitted with a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetails {
    /// Body type (sedan, SUV, ...)
    #[serde(rename = "type")]
    pub vehicle_type: String,
    /// Manufacturer
    pub make: String,
    /// Model
    pub model: String,
    /// Model year
    pub year: i32,
    /// Vehicle identification number
    #[serde(default)]
    pub vin: Option<String>,
    /// Tire size, refreshed on each booking
    #[serde(default)]
    pub tire_size: Option<String>,
}

impl VehicleDetails {
    /// Whether these details describe the same vehicle as `other`: by VIN when
    /// this side has one, otherwise by type, make, model and year.
    #[must_use]
    pub fn identifies(&self, other: &Self) -> bool {
        match self.vin.as_deref() {
            Some(vin) => other
                .vin
                .as_deref()
                .is_some_and(|theirs| theirs.eq_ignore_ascii_case(vin)),
            None => {
                self.vehicle_type.eq_ignore_ascii_case(&other.vehicle_type)
                    && self.make.eq_ignore_ascii_case(&other.make)
                    && self.model.eq_ignore_ascii_case(&other.model)
                    && self.year == other.year
            }
        }
    }
}

/// A stored vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Vehicle identifier
    pub id: VehicleId,
    /// Owner
    pub customer_id: CustomerId,
    /// Descriptive details
    #[serde(flatten)]
    pub details: VehicleDetails,
}

/// A staff user of the admin side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUser {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// E-mail address
    pub email: String,
    /// Receives admin booking notifications (at most one user at a time)
    pub receive_mail: bool,
}
