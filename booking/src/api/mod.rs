//! HTTP API handlers.
//!
//! Handlers parse input with the `autoshop_web` extractors, call the engine
//! through [`AppState`](crate::server::AppState), and return engine errors
//! through the [`AppError`] mapping below:
//!
//! | Engine error | Status | Code |
//! |---|---|---|
//! | `Validation` | 422 | `VALIDATION_ERROR` (with `errors` map) |
//! | `CapacityConflict` | 409 | `CAPACITY_CONFLICT` |
//! | `NotFound` | 404 | `NOT_FOUND` |
//! | `InvalidTransition` | 409 | `INVALID_TRANSITION` |
//! | `Store` | 500 | `INTERNAL_SERVER_ERROR` |

pub mod admin;
pub mod appointments;
pub mod availability;
pub mod services;

use crate::error::BookingError;
use autoshop_web::AppError;

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::Validation(errors) => {
                Self::validation_fields(errors.to_string(), errors.by_field())
            }
            BookingError::CapacityConflict { slot, reason } => {
                Self::conflict(format!("The {slot} slot is no longer available: {reason}."))
                    .with_code("CAPACITY_CONFLICT")
            }
            BookingError::NotFound { entity, id } => Self::not_found(entity, id),
            BookingError::InvalidTransition(invalid) => {
                Self::conflict(invalid.to_string()).with_code("INVALID_TRANSITION")
            }
            BookingError::Store(error) => {
                Self::internal("The booking service is temporarily unavailable, please retry.")
                    .with_source(anyhow::Error::new(error))
            }
        }
    }
}
