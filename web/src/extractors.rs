//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: the stock extractors with their
//!   rejections turned into [`AppError`] JSON bodies
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     ApiJson(body): ApiJson<BookingRequest>,
//! ) -> Result<Json<Appointment>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Processing booking");
//!     ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::from_headers;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query},
    http::request::Parts,
    Json,
};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Uses the id assigned by the correlation middleware when present, then the
/// `X-Correlation-ID` header, and generates a UUID v4 as a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        Ok(Self(from_headers(&parts.headers).unwrap_or_else(Uuid::new_v4)))
    }
}

/// JSON body extractor rejecting with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor rejecting with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path-parameter extractor rejecting with an [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
