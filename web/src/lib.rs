//! Axum integration for the autoshop booking engine.
//!
//! This crate is the imperative shell around the engine: it turns HTTP
//! requests into calls and domain errors into JSON responses.
//!
//! # Request Flow
//!
//! 1. **Correlate**: [`middleware::correlation_id`] tags the request and opens a span
//! 2. **Extract**: [`ApiJson`] / [`ApiQuery`] / [`ApiPath`] parse input, rejecting with [`AppError`]
//! 3. **Call** the engine
//! 4. **Map** the result (or the domain error, via [`AppError`]) to a response
//!
//! # Example
//!
//! ```ignore
//! use autoshop_web::{ApiJson, AppError};
//! use axum::{extract::State, Json};
//!
//! async fn submit(
//!     State(state): State<AppState>,
//!     ApiJson(request): ApiJson<BookingRequest>,
//! ) -> Result<Json<Appointment>, AppError> {
//!     let admitted = state.booking.submit(request).await?;
//!     Ok(Json(admitted.appointment))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

// Re-export key types for convenience
pub use error::{AppError, FieldErrors};
pub use extractors::{ApiJson, ApiPath, ApiQuery, CorrelationId};
pub use middleware::{correlation_id, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
