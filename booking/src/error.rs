//! Booking engine errors.
//!
//! | Error | Caller can recover by | HTTP |
//! |---|---|---|
//! | [`BookingError::Validation`] | fixing the input | 422 |
//! | [`BookingError::CapacityConflict`] | picking another slot | 409 |
//! | [`BookingError::NotFound`] | using a valid id | 404 |
//! | [`BookingError::InvalidTransition`] | choosing a legal status | 409 |
//! | [`BookingError::Store`] | retrying later | 500 |

use autoshop_core::capacity::CapacityExceeded;
use autoshop_core::catalog::RequirementKey;
use autoshop_core::ids::ServiceId;
use autoshop_core::schedule::Slot;
use autoshop_core::{InvalidTransition, StoreError};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One problem with client input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Service does not exist or is not active
    #[error("Service {0} is not available for booking.")]
    UnknownService(ServiceId),
    /// Requested slot is not after business-timezone now
    #[error("The appointment must be in the future.")]
    PastDate,
    /// Requested time is not a slot of that day's working hours
    #[error("The shop has no slot at {0}.")]
    UnavailableSlot(Slot),
    /// A required requirement has no (or an empty) answer
    #[error("The {key} field is required.")]
    MissingRequirement {
        /// Service owning the requirement
        service_id: ServiceId,
        /// Requirement key
        key: RequirementKey,
    },
    /// An answer does not match its requirement's type or bounds
    #[error("The {key} field {reason}.")]
    InvalidRequirement {
        /// Service owning the requirement
        service_id: ServiceId,
        /// Requirement key
        key: RequirementKey,
        /// What is wrong
        reason: String,
    },
    /// Availability range is reversed or too long
    #[error("The date range {0}.")]
    InvalidRange(String),
    /// Any other malformed field
    #[error("The {field} field {reason}.")]
    InvalidField {
        /// Dotted field path ("customer.email")
        field: String,
        /// What is wrong
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    #[must_use]
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Dotted request path this error belongs to.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::UnknownService(_) => "serviceIds".to_string(),
            Self::PastDate => "date".to_string(),
            Self::UnavailableSlot(_) => "time".to_string(),
            Self::MissingRequirement { service_id, key }
            | Self::InvalidRequirement { service_id, key, .. } => {
                format!("serviceRequirements.{service_id}.{key}")
            }
            Self::InvalidRange(_) => "from".to_string(),
            Self::InvalidField { field, .. } => field.clone(),
        }
    }
}

/// All problems found in one request, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// No errors yet.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records an error.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Whether `error` was recorded.
    #[must_use]
    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    /// `Ok(())` when empty, the errors otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Messages grouped by request path.
    #[must_use]
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.0 {
            map.entry(error.path()).or_default().push(error.to_string());
        }
        map
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [only] => write!(f, "{only}"),
            errors => write!(f, "{} validation errors", errors.len()),
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Errors returned by the booking engine's operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Client input was malformed or incomplete
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The slot filled up before the booking could be admitted
    #[error("slot {slot} is no longer available: {reason}")]
    CapacityConflict {
        /// Contested slot
        slot: Slot,
        /// Limit that was reached
        reason: CapacityExceeded,
    },

    /// Unknown service, appointment or user
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested identifier
        id: String,
    },

    /// Illegal lifecycle change
    #[error(transparent)]
    InvalidTransition(InvalidTransition),

    /// Storage failure; retryable
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<ValidationErrors> for BookingError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<ValidationError> for BookingError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::CapacityExceeded { slot, reason } => Self::CapacityConflict { slot, reason },
            StoreError::InvalidTransition(invalid) => Self::InvalidTransition(invalid),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_errors_grouped_by_request_path() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::PastDate);
        errors.push(ValidationError::MissingRequirement {
            service_id: ServiceId::new(2),
            key: RequirementKey::new("tire_size"),
        });
        errors.push(ValidationError::field("customer.email", "must be a valid email address"));

        let fields = errors.by_field();
        assert_eq!(fields["date"], vec!["The appointment must be in the future."]);
        assert_eq!(fields["serviceRequirements.2.tire_size"], vec!["The tire_size field is required."]);
        assert_eq!(
            fields["customer.email"],
            vec!["The customer.email field must be a valid email address."]
        );
    }

    #[test]
    fn test_store_errors_keep_their_meaning() {
        let missing = BookingError::from(StoreError::not_found("appointment", 7));
        assert_eq!(
            missing,
            BookingError::NotFound {
                entity: "appointment",
                id: "7".to_string()
            }
        );
        let outage = BookingError::from(StoreError::Database("timeout".to_string()));
        assert!(matches!(outage, BookingError::Store(_)));
    }
}
