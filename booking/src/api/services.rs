//! Service catalog endpoints.
//!
//! - GET /api/services - Active services with category and requirements
//! - GET /api/services/:slug - One active service

use crate::catalog::ServiceView;
use crate::server::state::AppState;
use autoshop_web::{ApiPath, AppError};
use axum::{extract::State, Json};

/// List the active service catalog.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/services
/// ```
///
/// # Errors
///
/// Returns 500 when the catalog cannot be loaded.
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceView>>, AppError> {
    let services = state.app.catalog.list_active_services().await?;
    Ok(Json(services))
}

/// Get one active service by slug.
///
/// # Errors
///
/// Returns 404 for unknown or inactive services.
pub async fn get_service(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<ServiceView>, AppError> {
    let service = state.app.catalog.get_service(&slug).await?;
    Ok(Json(service))
}
