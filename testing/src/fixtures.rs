//! Demo catalog, shop setting and staff.
//!
//! | id | service | base | notes |
//! |---|---|---|---|
//! | 1 | Oil Change | 45.00 | `oil_type` select (synthetic +15.00), cabin filter checkbox |
//! | 2 | Tire Rotation | 30.00 | capped at 1 per slot, `tire_size` required |
//! | 3 | Brake Inspection | quote | `axles` radio required, priced toggle and number |
//! | 4 | Engine Diagnostics | 89.00 | inactive |

use autoshop_core::catalog::{
    Catalog, CatalogError, RequirementKey, RequirementOption, RequirementType, Service,
    ServiceCategory, ServiceRequirement,
};
use autoshop_core::customer::StaffUser;
use autoshop_core::ids::{CategoryId, RequirementId, ServiceId, UserId};
use autoshop_core::money::Money;
use autoshop_core::schedule::{DayOfWeek, Setting, WorkingDay};
use chrono::{NaiveDate, NaiveTime};
use std::num::NonZeroU32;

/// Oil Change.
pub const OIL_CHANGE: ServiceId = ServiceId::new(1);
/// Tire Rotation (one per slot).
pub const TIRE_ROTATION: ServiceId = ServiceId::new(2);
/// Brake Inspection (quote required).
pub const BRAKE_INSPECTION: ServiceId = ServiceId::new(3);
/// Engine Diagnostics (inactive).
pub const ENGINE_DIAGNOSTICS: ServiceId = ServiceId::new(4);

/// Demo categories.
#[must_use]
pub fn categories() -> Vec<ServiceCategory> {
    [(1, "Maintenance", "maintenance"), (2, "Tires & Wheels", "tires-wheels"), (3, "Inspection", "inspection")]
        .into_iter()
        .map(|(id, name, slug)| ServiceCategory {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: slug.to_string(),
        })
        .collect()
}

fn service(
    id: ServiceId,
    category: i64,
    slug: &str,
    name: &str,
    base_price: Option<u64>,
    duration: &str,
) -> Service {
    Service {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        category_id: CategoryId::new(category),
        description: format!("{name} performed by certified technicians."),
        base_price: base_price.map(Money::from_cents),
        estimated_duration: Some(duration.to_string()),
        max_concurrent_bookings: None,
        is_active: true,
    }
}

/// Demo services.
#[must_use]
pub fn services() -> Vec<Service> {
    let mut rotation = service(TIRE_ROTATION, 2, "tire-rotation", "Tire Rotation", Some(3000), "30 minutes");
    rotation.max_concurrent_bookings = NonZeroU32::new(1);

    let mut diagnostics = service(
        ENGINE_DIAGNOSTICS,
        3,
        "engine-diagnostics",
        "Engine Diagnostics",
        Some(8900),
        "1-2 hours",
    );
    diagnostics.is_active = false;

    vec![
        service(OIL_CHANGE, 1, "oil-change", "Oil Change", Some(4500), "30-45 minutes"),
        rotation,
        service(BRAKE_INSPECTION, 3, "brake-inspection", "Brake Inspection", None, "1 hour"),
        diagnostics,
    ]
}

fn option(label: &str, value: &str, cents: u64) -> RequirementOption {
    RequirementOption {
        label: label.to_string(),
        value: value.to_string(),
        price: Money::from_cents(cents),
    }
}

fn requirement(
    id: i64,
    service_id: ServiceId,
    label: &str,
    kind: RequirementType,
    is_required: bool,
    sort_order: i32,
) -> ServiceRequirement {
    ServiceRequirement {
        id: RequirementId::new(id),
        service_id,
        label: label.to_string(),
        key: RequirementKey::from_label(label),
        kind,
        is_required,
        sort_order,
    }
}

/// Demo requirements.
///
/// Keys: `oil_type`, `current_mileage`, `replace_cabin_filter`, `tire_size`,
/// `extra_services`, `wheel_lock_location`, `axles`, `rotor_resurfacing`,
/// `last_brake_service`, `brake_fluid_liters`.
#[must_use]
pub fn requirements() -> Vec<ServiceRequirement> {
    vec![
        requirement(
            1,
            OIL_CHANGE,
            "Oil type",
            RequirementType::Select {
                options: vec![
                    option("Conventional", "conventional", 0),
                    option("Synthetic", "synthetic", 1500),
                    option("High mileage", "high_mileage", 800),
                ],
            },
            false,
            1,
        ),
        requirement(
            2,
            OIL_CHANGE,
            "Current mileage",
            RequirementType::Number {
                max_digits: Some(6),
                unit_price: None,
            },
            false,
            2,
        ),
        requirement(
            3,
            OIL_CHANGE,
            "Replace cabin filter",
            RequirementType::Checkbox {
                price: Money::from_cents(1250),
            },
            false,
            3,
        ),
        requirement(4, TIRE_ROTATION, "Tire size", RequirementType::Text, true, 1),
        requirement(
            5,
            TIRE_ROTATION,
            "Extra services",
            RequirementType::Multiselect {
                options: vec![
                    option("Wheel balancing", "balancing", 2000),
                    option("Alignment check", "alignment", 3500),
                    option("Valve stem check", "valve_stems", 0),
                ],
            },
            false,
            2,
        ),
        requirement(6, TIRE_ROTATION, "Wheel lock location", RequirementType::Textarea, false, 3),
        requirement(
            7,
            BRAKE_INSPECTION,
            "Axles",
            RequirementType::Radio {
                options: vec![
                    option("Front", "front", 0),
                    option("Rear", "rear", 0),
                    option("Both", "both", 1000),
                ],
            },
            true,
            1,
        ),
        requirement(
            8,
            BRAKE_INSPECTION,
            "Rotor resurfacing",
            RequirementType::Toggle {
                price: Money::from_cents(2500),
            },
            false,
            2,
        ),
        requirement(
            9,
            BRAKE_INSPECTION,
            "Last brake service",
            RequirementType::Date {
                min_date: NaiveDate::from_ymd_opt(2000, 1, 1),
                max_date: None,
            },
            false,
            3,
        ),
        requirement(
            10,
            BRAKE_INSPECTION,
            "Brake fluid (liters)",
            RequirementType::Number {
                max_digits: Some(2),
                unit_price: Some(Money::from_cents(600)),
            },
            false,
            4,
        ),
    ]
}

/// The demo catalog snapshot.
///
/// # Errors
///
/// Never fails for the fixture data; the `Result` mirrors [`Catalog::new`].
pub fn catalog() -> Result<Catalog, CatalogError> {
    Catalog::new(categories(), services(), requirements())
}

fn hours(h: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, 0, 0)
}

/// Mon-Fri 08:00-18:00, Sat 09:00-14:00, Sunday off, three bays, New York time.
#[must_use]
pub fn setting() -> Setting {
    let working_hours = DayOfWeek::ALL
        .into_iter()
        .map(|day| match day {
            DayOfWeek::Sunday => WorkingDay::day_off(day),
            DayOfWeek::Saturday => WorkingDay {
                day,
                open: hours(9),
                close: hours(14),
                is_day_off: false,
            },
            _ => WorkingDay {
                day,
                open: hours(8),
                close: hours(18),
                is_day_off: false,
            },
        })
        .collect();

    Setting {
        total_capacity: 3,
        timezone: chrono_tz::America::New_York,
        working_hours,
    }
}

/// Two staff users; the first one receives booking mail.
#[must_use]
pub fn staff() -> Vec<StaffUser> {
    vec![
        StaffUser {
            id: UserId::new(1),
            name: "Alex Admin".to_string(),
            email: "alex@autoshop.test".to_string(),
            receive_mail: true,
        },
        StaffUser {
            id: UserId::new(2),
            name: "Sam Service".to_string(),
            email: "sam@autoshop.test".to_string(),
            receive_mail: false,
        },
    ]
}
