//! Service catalog: categories, services and their configurable requirements.
//!
//! The catalog is written by the admin side and only read by the booking
//! engine. [`Catalog::new`] checks the structural invariants once, when a
//! snapshot is loaded, so the rest of the engine can rely on them.

use crate::ids::{CategoryId, RequirementId, ServiceId};
use crate::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

/// A grouping of services shown together in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    /// Category identifier
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// URL slug (unique)
    pub slug: String,
}

/// A bookable service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service identifier
    pub id: ServiceId,
    /// URL slug (unique)
    pub slug: String,
    /// Display name
    pub name: String,
    /// Owning category
    pub category_id: CategoryId,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Base price; `None` means the shop quotes on site
    pub base_price: Option<Money>,
    /// Free-text duration ("1-2 hours"), display only
    pub estimated_duration: Option<String>,
    /// Per-slot cap for this service, on top of the shop-wide capacity
    pub max_concurrent_bookings: Option<NonZeroU32>,
    /// Inactive services are neither listed nor bookable
    pub is_active: bool,
}

/// Stable identifier of a requirement within its service.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementKey(String);

impl RequirementKey {
    /// Wraps an explicit key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from a label: lower-case ASCII alphanumerics, every run
    /// of other characters collapsed to a single `_`.
    ///
    /// `"Oil Type (grade)"` becomes `oil_type_grade`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut key = String::with_capacity(label.len());
        let mut pending_separator = false;
        for c in label.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_separator && !key.is_empty() {
                    key.push('_');
                }
                pending_separator = false;
                key.push(c.to_ascii_lowercase());
            } else {
                pending_separator = true;
            }
        }
        Self(key)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One choice of a select, multiselect or radio requirement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementOption {
    /// Display label
    pub label: String,
    /// Submitted value (unique within the requirement)
    pub value: String,
    /// Surcharge when chosen
    #[serde(default)]
    pub price: Money,
}

/// The closed set of requirement kinds, each with its own payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RequirementType {
    /// Single-line text
    Text,
    /// Multi-line text
    Textarea,
    /// Numeric input, optionally priced per unit
    Number {
        /// Maximum number of integer digits
        #[serde(default, rename = "numberMaxLength")]
        max_digits: Option<u32>,
        /// Price per unit of the answer
        #[serde(default)]
        unit_price: Option<Money>,
    },
    /// One option from a drop-down
    Select {
        /// Available options, in display order
        options: Vec<RequirementOption>,
    },
    /// Any number of options
    Multiselect {
        /// Available options, in display order
        options: Vec<RequirementOption>,
    },
    /// One option from a radio group
    Radio {
        /// Available options, in display order
        options: Vec<RequirementOption>,
    },
    /// Tick box with a flat surcharge
    Checkbox {
        /// Surcharge when ticked
        #[serde(default)]
        price: Money,
    },
    /// Switch with a flat surcharge
    Toggle {
        /// Surcharge when on
        #[serde(default)]
        price: Money,
    },
    /// Calendar date, optionally bounded
    Date {
        /// Earliest accepted date (inclusive)
        #[serde(default)]
        min_date: Option<NaiveDate>,
        /// Latest accepted date (inclusive)
        #[serde(default)]
        max_date: Option<NaiveDate>,
    },
}

impl RequirementType {
    /// Wire name of the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number { .. } => "number",
            Self::Select { .. } => "select",
            Self::Multiselect { .. } => "multiselect",
            Self::Radio { .. } => "radio",
            Self::Checkbox { .. } => "checkbox",
            Self::Toggle { .. } => "toggle",
            Self::Date { .. } => "date",
        }
    }

    /// Options for choice kinds, `None` otherwise.
    #[must_use]
    pub fn options(&self) -> Option<&[RequirementOption]> {
        match self {
            Self::Select { options } | Self::Multiselect { options } | Self::Radio { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// A per-service input the customer fills in when booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequirement {
    /// Requirement identifier
    pub id: RequirementId,
    /// Owning service
    pub service_id: ServiceId,
    /// Display label
    pub label: String,
    /// Answer key, unique within the service
    pub key: RequirementKey,
    /// Kind and kind-specific settings
    #[serde(flatten)]
    pub kind: RequirementType,
    /// Whether an answer must be given
    pub is_required: bool,
    /// Display position
    pub sort_order: i32,
}

/// Structural problems found when loading a catalog snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two services share a slug
    #[error("duplicate service slug '{0}'")]
    DuplicateSlug(String),
    /// A service points at a category that does not exist
    #[error("service {service_id} references unknown category {category_id}")]
    UnknownCategory {
        /// Offending service
        service_id: ServiceId,
        /// Missing category
        category_id: CategoryId,
    },
    /// A requirement points at a service that does not exist
    #[error("requirement {requirement_id} references unknown service {service_id}")]
    UnknownService {
        /// Offending requirement
        requirement_id: RequirementId,
        /// Missing service
        service_id: ServiceId,
    },
    /// Two requirements of one service share a key
    #[error("service {service_id} has duplicate requirement key '{key}'")]
    DuplicateRequirementKey {
        /// Service owning the requirements
        service_id: ServiceId,
        /// Repeated key
        key: RequirementKey,
    },
    /// A choice requirement has no options
    #[error("requirement '{key}' of service {service_id} has no options")]
    MissingOptions {
        /// Service owning the requirement
        service_id: ServiceId,
        /// Requirement key
        key: RequirementKey,
    },
    /// Two options of one requirement share a value
    #[error("requirement '{key}' of service {service_id} repeats option value '{value}'")]
    DuplicateOptionValue {
        /// Service owning the requirement
        service_id: ServiceId,
        /// Requirement key
        key: RequirementKey,
        /// Repeated value
        value: String,
    },
}

/// A validated, read-only snapshot of the service catalog.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    categories: BTreeMap<CategoryId, ServiceCategory>,
    services: BTreeMap<ServiceId, Service>,
    requirements: BTreeMap<ServiceId, Vec<ServiceRequirement>>,
}

impl Catalog {
    /// Builds a snapshot, checking slug, key and option invariants.
    ///
    /// Requirements are stored per service in `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn new(
        categories: Vec<ServiceCategory>,
        services: Vec<Service>,
        requirements: Vec<ServiceRequirement>,
    ) -> Result<Self, CatalogError> {
        let categories: BTreeMap<_, _> = categories.into_iter().map(|c| (c.id, c)).collect();

        let mut slugs = BTreeSet::new();
        let mut by_id = BTreeMap::new();
        for service in services {
            if !categories.contains_key(&service.category_id) {
                return Err(CatalogError::UnknownCategory {
                    service_id: service.id,
                    category_id: service.category_id,
                });
            }
            if !slugs.insert(service.slug.clone()) {
                return Err(CatalogError::DuplicateSlug(service.slug));
            }
            by_id.insert(service.id, service);
        }

        let mut grouped: BTreeMap<ServiceId, Vec<ServiceRequirement>> = BTreeMap::new();
        for requirement in requirements {
            if !by_id.contains_key(&requirement.service_id) {
                return Err(CatalogError::UnknownService {
                    requirement_id: requirement.id,
                    service_id: requirement.service_id,
                });
            }
            check_options(&requirement)?;
            let siblings = grouped.entry(requirement.service_id).or_default();
            if siblings.iter().any(|r| r.key == requirement.key) {
                return Err(CatalogError::DuplicateRequirementKey {
                    service_id: requirement.service_id,
                    key: requirement.key,
                });
            }
            siblings.push(requirement);
        }
        for siblings in grouped.values_mut() {
            siblings.sort_by_key(|r| (r.sort_order, r.id));
        }

        Ok(Self {
            categories,
            services: by_id,
            requirements: grouped,
        })
    }

    /// Active services ordered by category name, then service name.
    #[must_use]
    pub fn active_services(&self) -> Vec<&Service> {
        let mut active: Vec<&Service> = self.services.values().filter(|s| s.is_active).collect();
        active.sort_by(|a, b| {
            let category = |s: &Service| self.categories.get(&s.category_id).map(|c| c.name.as_str());
            category(a)
                .cmp(&category(b))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        active
    }

    /// Looks up an active service by slug.
    #[must_use]
    pub fn active_service_by_slug(&self, slug: &str) -> Option<&Service> {
        self.services
            .values()
            .find(|s| s.is_active && s.slug == slug)
    }

    /// Looks up an active service by id.
    #[must_use]
    pub fn active_service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(&id).filter(|s| s.is_active)
    }

    /// Looks up any service, active or not.
    #[must_use]
    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(&id)
    }

    /// Requirements of a service in `sort_order`.
    #[must_use]
    pub fn requirements(&self, service_id: ServiceId) -> &[ServiceRequirement] {
        self.requirements
            .get(&service_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Looks up a category.
    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&ServiceCategory> {
        self.categories.get(&id)
    }
}

fn check_options(requirement: &ServiceRequirement) -> Result<(), CatalogError> {
    let Some(options) = requirement.kind.options() else {
        return Ok(());
    };
    if options.is_empty() {
        return Err(CatalogError::MissingOptions {
            service_id: requirement.service_id,
            key: requirement.key.clone(),
        });
    }
    let mut seen = BTreeSet::new();
    for option in options {
        if !seen.insert(option.value.as_str()) {
            return Err(CatalogError::DuplicateOptionValue {
                service_id: requirement.service_id,
                key: requirement.key.clone(),
                value: option.value.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use serde_json::json;

    fn category(id: i64, name: &str) -> ServiceCategory {
        ServiceCategory {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: name.to_lowercase(),
        }
    }

    fn service(id: i64, category: i64, name: &str, active: bool) -> Service {
        Service {
            id: ServiceId::new(id),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            category_id: CategoryId::new(category),
            description: String::new(),
            base_price: None,
            estimated_duration: None,
            max_concurrent_bookings: None,
            is_active: active,
        }
    }

    fn requirement(id: i64, service: i64, key: &str, kind: RequirementType) -> ServiceRequirement {
        ServiceRequirement {
            id: RequirementId::new(id),
            service_id: ServiceId::new(service),
            label: key.to_string(),
            key: RequirementKey::new(key),
            kind,
            is_required: false,
            sort_order: i32::try_from(10 - id).unwrap(),
        }
    }

    #[test]
    fn test_key_from_label() {
        assert_eq!(RequirementKey::from_label("Oil Type").as_str(), "oil_type");
        assert_eq!(RequirementKey::from_label("  Tire size (inches)  ").as_str(), "tire_size_inches");
        assert_eq!(RequirementKey::from_label("VIN#").as_str(), "vin");
    }

    #[test]
    fn test_active_services_sorted_by_category_then_name() {
        let catalog = Catalog::new(
            vec![category(1, "Tires"), category(2, "Maintenance")],
            vec![
                service(1, 1, "Rotation", true),
                service(2, 2, "Oil Change", true),
                service(3, 2, "Brake Check", true),
                service(4, 2, "Retired", false),
            ],
            vec![],
        )
        .unwrap();

        let names: Vec<_> = catalog.active_services().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Brake Check", "Oil Change", "Rotation"]);
        assert!(catalog.active_service_by_slug("retired").is_none());
        assert!(catalog.service(ServiceId::new(4)).is_some());
    }

    #[test]
    fn test_requirements_sorted_and_keys_unique() {
        let catalog = Catalog::new(
            vec![category(1, "Maintenance")],
            vec![service(1, 1, "Oil Change", true)],
            vec![
                requirement(1, 1, "first", RequirementType::Text),
                requirement(2, 1, "second", RequirementType::Text),
            ],
        )
        .unwrap();
        let keys: Vec<_> = catalog
            .requirements(ServiceId::new(1))
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(keys, vec!["second", "first"]);

        let duplicate = Catalog::new(
            vec![category(1, "Maintenance")],
            vec![service(1, 1, "Oil Change", true)],
            vec![
                requirement(1, 1, "same", RequirementType::Text),
                requirement(2, 1, "same", RequirementType::Textarea),
            ],
        );
        assert!(matches!(duplicate, Err(CatalogError::DuplicateRequirementKey { .. })));
    }

    #[test]
    fn test_choice_requirements_need_distinct_options() {
        let empty = Catalog::new(
            vec![category(1, "Maintenance")],
            vec![service(1, 1, "Oil Change", true)],
            vec![requirement(1, 1, "oil", RequirementType::Select { options: vec![] })],
        );
        assert!(matches!(empty, Err(CatalogError::MissingOptions { .. })));

        let option = |value: &str| RequirementOption {
            label: value.to_string(),
            value: value.to_string(),
            price: Money::ZERO,
        };
        let repeated = Catalog::new(
            vec![category(1, "Maintenance")],
            vec![service(1, 1, "Oil Change", true)],
            vec![requirement(
                1,
                1,
                "oil",
                RequirementType::Radio {
                    options: vec![option("a"), option("a")],
                },
            )],
        );
        assert!(matches!(repeated, Err(CatalogError::DuplicateOptionValue { .. })));
    }

    #[test]
    fn test_requirement_wire_format() {
        let parsed: ServiceRequirement = serde_json::from_value(json!({
            "id": 3,
            "serviceId": 1,
            "label": "Oil type",
            "key": "oil_type",
            "type": "select",
            "options": [{"label": "Synthetic", "value": "synthetic", "price": "15.00"}],
            "isRequired": false,
            "sortOrder": 1
        }))
        .unwrap();
        assert_eq!(parsed.kind.name(), "select");
        assert_eq!(parsed.kind.options().unwrap()[0].price, Money::from_cents(1500));

        let number: RequirementType =
            serde_json::from_value(json!({"type": "number", "numberMaxLength": 3, "unitPrice": 2})).unwrap();
        assert_eq!(
            number,
            RequirementType::Number {
                max_digits: Some(3),
                unit_price: Some(Money::from_cents(200)),
            }
        );
    }
}
