//! Booking admission controller.
//!
//! [`BookingService::submit`] runs the whole admission pipeline:
//!
//! 1. Field validation of the request body (all problems collected)
//! 2. Services must exist and be active
//! 3. The slot must be in the future and on the working-hours grid
//! 4. Required requirements must be answered; given answers must fit
//! 5. Pricing (pure, done before the critical section)
//! 6. Customer and vehicle resolution
//! 7. [`AppointmentStore::admit`]: capacity re-check plus insert under the
//!    slot lock
//! 8. Notification dispatch, after commit and detached from the response

use crate::answers;
use crate::catalog::bookable_services;
use crate::error::{BookingError, ValidationError, ValidationErrors};
use crate::metrics::{self, BookingOutcome};
use crate::notification::NotificationDispatcher;
use crate::pricing;
use crate::settings::SettingsCache;
use autoshop_core::appointment::{Answers, Appointment, NewAppointment};
use autoshop_core::capacity::SlotLimits;
use autoshop_core::catalog::{Catalog, Service};
use autoshop_core::customer::{Customer, CustomerDetails, Vehicle, VehicleDetails};
use autoshop_core::environment::Clock;
use autoshop_core::ids::ServiceId;
use autoshop_core::notify::{BookedService, BookingAdmitted};
use autoshop_core::pricing::PriceQuote;
use autoshop_core::schedule::{Setting, Slot, SlotLength, hh_mm};
use autoshop_core::store::{AppointmentStore, CatalogStore, CustomerStore};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinHandle;

const NAME_MAX_CHARS: usize = 255;
const PHONE_MAX_CHARS: usize = 32;
const VEHICLE_FIELD_MAX_CHARS: usize = 100;
const NOTES_MAX_CHARS: usize = 1000;
const VIN_LENGTH: usize = 17;
const OLDEST_MODEL_YEAR: i32 = 1900;

/// Contact details as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInput {
    /// Full name
    pub full_name: String,
    /// Phone number
    pub phone: String,
    /// E-mail address
    pub email: String,
    /// SMS opt-in
    pub sms_updates: bool,
}

/// Vehicle details as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleInput {
    /// Body type
    #[serde(rename = "type")]
    pub vehicle_type: String,
    /// Manufacturer
    pub make: String,
    /// Model
    pub model: String,
    /// Model year
    pub year: Option<i32>,
    /// Vehicle identification number
    pub vin: Option<String>,
    /// Tire size
    pub tire_size: Option<String>,
}

/// A booking request as submitted by a customer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    /// Requested services
    pub service_ids: Vec<ServiceId>,
    /// Vehicle to service
    pub vehicle: VehicleInput,
    /// Requirement answers per service, by requirement key
    pub service_requirements: BTreeMap<ServiceId, Answers>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    /// Customer contact details
    pub customer: CustomerInput,
    /// Free-form notes
    pub notes: Option<String>,
}

/// A committed booking.
#[derive(Debug)]
pub struct Admitted {
    /// The stored appointment
    pub appointment: Appointment,
    /// Price breakdown
    pub quote: PriceQuote,
    /// Resolved customer
    pub customer: Customer,
    /// Resolved vehicle
    pub vehicle: Vehicle,
    /// Background notification delivery; dropping it detaches the task
    pub notification: JoinHandle<()>,
}

/// Request fields after validation.
struct CheckedFields {
    slot: Option<Slot>,
    customer: CustomerDetails,
    vehicle: VehicleDetails,
    notes: Option<String>,
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(ValidationError::field(field, "is required"));
    } else if value.chars().count() > max {
        errors.push(ValidationError::field(
            field,
            format!("may not be greater than {max} characters"),
        ));
    }
    value.to_string()
}

fn is_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn is_vin(vin: &str) -> bool {
    vin.len() == VIN_LENGTH
        && vin
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c.to_ascii_uppercase(), 'I' | 'O' | 'Q'))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Checks the request body field by field.
fn check_fields(
    request: &BookingRequest,
    current_year: i32,
    errors: &mut ValidationErrors,
) -> CheckedFields {
    if request.service_ids.is_empty() {
        errors.push(ValidationError::field("serviceIds", "must contain at least one service"));
    } else {
        let distinct: BTreeSet<_> = request.service_ids.iter().collect();
        if distinct.len() != request.service_ids.len() {
            errors.push(ValidationError::field("serviceIds", "must not contain duplicates"));
        }
    }

    let customer = &request.customer;
    let full_name = check_length(errors, "customer.fullName", &customer.full_name, NAME_MAX_CHARS);
    let phone = check_length(errors, "customer.phone", &customer.phone, PHONE_MAX_CHARS);
    let email = customer.email.trim().to_string();
    if !is_email(&email) {
        errors.push(ValidationError::field("customer.email", "must be a valid email address"));
    }

    let vehicle = &request.vehicle;
    let vehicle_type = check_length(errors, "vehicle.type", &vehicle.vehicle_type, VEHICLE_FIELD_MAX_CHARS);
    let make = check_length(errors, "vehicle.make", &vehicle.make, VEHICLE_FIELD_MAX_CHARS);
    let model = check_length(errors, "vehicle.model", &vehicle.model, VEHICLE_FIELD_MAX_CHARS);
    let latest_year = current_year + 1;
    let year = match vehicle.year {
        None => {
            errors.push(ValidationError::field("vehicle.year", "is required"));
            0
        }
        Some(year) if !(OLDEST_MODEL_YEAR..=latest_year).contains(&year) => {
            errors.push(ValidationError::field(
                "vehicle.year",
                format!("must be between {OLDEST_MODEL_YEAR} and {latest_year}"),
            ));
            year
        }
        Some(year) => year,
    };
    let vin = non_blank(vehicle.vin.as_deref()).map(|vin| vin.to_ascii_uppercase());
    if vin.as_deref().is_some_and(|vin| !is_vin(vin)) {
        errors.push(ValidationError::field(
            "vehicle.vin",
            "must be 17 letters or digits, excluding I, O and Q",
        ));
    }

    let notes = non_blank(request.notes.as_deref());
    if notes.as_ref().is_some_and(|n| n.chars().count() > NOTES_MAX_CHARS) {
        errors.push(ValidationError::field(
            "notes",
            format!("may not be greater than {NOTES_MAX_CHARS} characters"),
        ));
    }

    let date = NaiveDate::parse_from_str(request.date.trim(), "%Y-%m-%d")
        .map_err(|_| errors.push(ValidationError::field("date", "must be a date in YYYY-MM-DD format")))
        .ok();
    let time = hh_mm::parse(request.time.trim())
        .map_err(|_| errors.push(ValidationError::field("time", "must be a time in HH:MM format")))
        .ok();

    CheckedFields {
        slot: date.zip(time).map(|(date, time)| Slot::new(date, time)),
        customer: CustomerDetails {
            full_name,
            phone,
            email,
            sms_updates: customer.sms_updates,
        },
        vehicle: VehicleDetails {
            vehicle_type,
            make,
            model,
            year,
            vin,
            tire_size: non_blank(vehicle.tire_size.as_deref()),
        },
        notes,
    }
}

/// Checks the slot against "now" and the working-hours grid.
fn check_slot(
    slot: Slot,
    setting: &Setting,
    slot_length: SlotLength,
    local_now: NaiveDateTime,
    errors: &mut ValidationErrors,
) {
    if slot.starts_at() <= local_now {
        errors.push(ValidationError::PastDate);
    } else if !setting.is_bookable(slot, slot_length) {
        errors.push(ValidationError::UnavailableSlot(slot));
    }
}

/// Applies the emptiness rule to required requirements and type-checks
/// every given answer. Returns the answers restricted to known keys.
fn check_answers(
    catalog: &Catalog,
    services: &[&Service],
    submitted: &BTreeMap<ServiceId, Answers>,
    errors: &mut ValidationErrors,
) -> BTreeMap<ServiceId, Answers> {
    let mut kept = BTreeMap::new();
    for service in services {
        let given = submitted.get(&service.id);
        let mut known = Answers::new();
        for requirement in catalog.requirements(service.id) {
            let value = given.and_then(|answers| answers.get(requirement.key.as_str()));
            if requirement.is_required && answers::is_empty(&requirement.kind, value) {
                errors.push(ValidationError::MissingRequirement {
                    service_id: service.id,
                    key: requirement.key.clone(),
                });
                continue;
            }
            let Some(value) = value else {
                continue;
            };
            if let Err(reason) = answers::check(&requirement.kind, value) {
                errors.push(ValidationError::InvalidRequirement {
                    service_id: service.id,
                    key: requirement.key.clone(),
                    reason,
                });
            }
            known.insert(requirement.key.as_str().to_string(), value.clone());
        }
        kept.insert(service.id, known);
    }
    kept
}

/// The booking admission controller.
#[derive(Clone)]
pub struct BookingService {
    catalog: Arc<dyn CatalogStore>,
    appointments: Arc<dyn AppointmentStore>,
    customers: Arc<dyn CustomerStore>,
    settings: Arc<SettingsCache>,
    notifications: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    slot_length: SlotLength,
}

impl BookingService {
    /// Controller over the given stores.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        appointments: Arc<dyn AppointmentStore>,
        customers: Arc<dyn CustomerStore>,
        settings: Arc<SettingsCache>,
        notifications: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        slot_length: SlotLength,
    ) -> Self {
        Self {
            catalog,
            appointments,
            customers,
            settings,
            notifications,
            clock,
            slot_length,
        }
    }

    /// Validates, prices and admits a booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] with every problem found in the request
    /// - [`BookingError::CapacityConflict`] when the slot is full at commit
    /// - [`BookingError::Store`] when a store fails
    pub async fn submit(&self, request: BookingRequest) -> Result<Admitted, BookingError> {
        let result = self.admit(request).await;
        match &result {
            Ok(admitted) => {
                metrics::record_booking(BookingOutcome::Admitted);
                tracing::info!(
                    appointment_id = %admitted.appointment.id,
                    slot = %admitted.appointment.slot(),
                    total = %admitted.quote.total,
                    "Booking admitted"
                );
            }
            Err(BookingError::Validation(errors)) => {
                metrics::record_booking(BookingOutcome::ValidationFailed);
                tracing::debug!(errors = ?errors.by_field(), "Booking rejected");
            }
            Err(BookingError::CapacityConflict { slot, reason }) => {
                metrics::record_booking(BookingOutcome::CapacityConflict);
                tracing::info!(%slot, %reason, "Booking lost the slot");
            }
            Err(error) => tracing::error!(%error, "Booking failed"),
        }
        result
    }

    async fn admit(&self, request: BookingRequest) -> Result<Admitted, BookingError> {
        let catalog = self.catalog.load_catalog().await?;
        let setting = self.settings.get().await?;
        let now = self.clock.now();
        let local_now = setting.local_now(now);

        let mut errors = ValidationErrors::new();
        let fields = check_fields(&request, local_now.year(), &mut errors);
        let services = bookable_services(&catalog, &request.service_ids, &mut errors);
        if let Some(slot) = fields.slot {
            check_slot(slot, &setting, self.slot_length, local_now, &mut errors);
        }
        let answers = check_answers(&catalog, &services, &request.service_requirements, &mut errors);
        errors.into_result()?;
        let Some(slot) = fields.slot else {
            return Err(ValidationError::field("date", "is required").into());
        };

        let quote = PriceQuote::combine(services.iter().map(|service| {
            let answers = answers.get(&service.id).cloned().unwrap_or_default();
            pricing::price(service, catalog.requirements(service.id), &answers)
        }));

        let customer = self.customers.resolve_customer(fields.customer, now).await?;
        let vehicle = self
            .customers
            .resolve_vehicle(customer.id, fields.vehicle)
            .await?;

        let limits = SlotLimits::for_services(setting.total_capacity, services.iter().copied());
        let appointment = self
            .appointments
            .admit(
                NewAppointment {
                    customer_id: customer.id,
                    vehicle_id: vehicle.id,
                    service_ids: request.service_ids.clone(),
                    slot,
                    estimated_price: quote.total,
                    notes: fields.notes,
                    service_requirements: answers,
                    requested_at: now,
                },
                limits,
            )
            .await?;

        let notification = self.notifications.dispatch(BookingAdmitted {
            appointment: appointment.clone(),
            customer: customer.clone(),
            vehicle: vehicle.clone(),
            services: services
                .iter()
                .map(|service| BookedService {
                    id: service.id,
                    name: service.name.clone(),
                })
                .collect(),
            quote: quote.clone(),
        });

        Ok(Admitted {
            appointment,
            quote,
            customer,
            vehicle,
            notification,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn request() -> BookingRequest {
        BookingRequest {
            service_ids: vec![ServiceId::new(1)],
            vehicle: VehicleInput {
                vehicle_type: "sedan".to_string(),
                make: "Honda".to_string(),
                model: "Civic".to_string(),
                year: Some(2019),
                vin: None,
                tire_size: None,
            },
            service_requirements: BTreeMap::new(),
            date: "2024-06-10".to_string(),
            time: "09:00".to_string(),
            customer: CustomerInput {
                full_name: "Jordan Lee".to_string(),
                phone: "555-0100".to_string(),
                email: "jordan@example.com".to_string(),
                sms_updates: true,
            },
            notes: Some("  ".to_string()),
        }
    }

    fn fields_of(request: &BookingRequest) -> (CheckedFields, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let fields = check_fields(request, 2024, &mut errors);
        (fields, errors)
    }

    #[test]
    fn test_valid_fields_are_normalized() {
        let mut request = request();
        request.vehicle.vin = Some(" 1hgcm82633a004352 ".to_string());
        let (fields, errors) = fields_of(&request);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(fields.vehicle.vin.as_deref(), Some("1HGCM82633A004352"));
        assert_eq!(fields.notes, None);
        assert_eq!(fields.slot.unwrap().to_string(), "2024-06-10 09:00");
    }

    #[test]
    fn test_all_field_errors_are_collected() {
        let mut request = request();
        request.service_ids = vec![];
        request.customer.full_name = String::new();
        request.customer.email = "jordan@localhost".to_string();
        request.vehicle.year = Some(2026);
        request.vehicle.vin = Some("1HGCM82633A00435O".to_string());
        request.date = "10/06/2024".to_string();
        request.time = "9am".to_string();

        let (fields, errors) = fields_of(&request);
        let by_field = errors.by_field();
        let keys: Vec<_> = by_field.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "customer.email",
                "customer.fullName",
                "date",
                "serviceIds",
                "time",
                "vehicle.vin",
                "vehicle.year",
            ]
        );
        assert!(fields.slot.is_none());
    }

    #[test]
    fn test_duplicate_services_rejected() {
        let mut request = request();
        request.service_ids = vec![ServiceId::new(1), ServiceId::new(1)];
        let (_, errors) = fields_of(&request);
        assert_eq!(
            errors.by_field()["serviceIds"],
            ["The serviceIds field must not contain duplicates."]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a@.b"));
        assert!(!is_email("a b@c.d"));
    }

    #[test]
    fn test_request_wire_format() {
        let request: BookingRequest = serde_json::from_value(serde_json::json!({
            "serviceIds": [1, 2],
            "vehicle": {"type": "suv", "make": "Ford", "model": "Escape", "year": 2020, "tireSize": "225/65R17"},
            "serviceRequirements": {"1": {"oil_type": "synthetic"}},
            "date": "2024-06-11",
            "time": "10:00",
            "customer": {"fullName": "Jordan Lee", "phone": "555", "email": "j@example.com"},
        }))
        .unwrap();
        assert_eq!(request.service_ids, [ServiceId::new(1), ServiceId::new(2)]);
        assert_eq!(request.vehicle.tire_size.as_deref(), Some("225/65R17"));
        assert_eq!(request.service_requirements[&ServiceId::new(1)]["oil_type"], "synthetic");
        assert!(!request.customer.sms_updates);
    }
}
