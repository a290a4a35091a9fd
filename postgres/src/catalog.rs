//! Catalog snapshots.

use crate::{cents_to_money, db_error};
use autoshop_core::catalog::{
    Catalog, RequirementKey, RequirementType, Service, ServiceCategory, ServiceRequirement,
};
use autoshop_core::ids::{CategoryId, RequirementId, ServiceId};
use autoshop_core::store::{BoxFuture, CatalogStore, StoreError};
use sqlx::types::Json;
use sqlx::PgPool;
use std::num::NonZeroU32;

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    category_id: i64,
    slug: String,
    name: String,
    description: String,
    base_price_cents: Option<i64>,
    estimated_duration: Option<String>,
    max_concurrent_bookings: Option<i32>,
    is_active: bool,
}

impl ServiceRow {
    fn into_service(self) -> Result<Service, StoreError> {
        let base_price = self
            .base_price_cents
            .map(|cents| cents_to_money("services.base_price_cents", cents))
            .transpose()?;
        let max_concurrent_bookings = self
            .max_concurrent_bookings
            .and_then(|cap| u32::try_from(cap).ok())
            .and_then(NonZeroU32::new);
        Ok(Service {
            id: ServiceId::new(self.id),
            slug: self.slug,
            name: self.name,
            category_id: CategoryId::new(self.category_id),
            description: self.description,
            base_price,
            estimated_duration: self.estimated_duration,
            max_concurrent_bookings,
            is_active: self.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequirementRow {
    id: i64,
    service_id: i64,
    label: String,
    key: String,
    definition: Json<RequirementType>,
    is_required: bool,
    sort_order: i32,
}

impl From<RequirementRow> for ServiceRequirement {
    fn from(row: RequirementRow) -> Self {
        Self {
            id: RequirementId::new(row.id),
            service_id: ServiceId::new(row.service_id),
            label: row.label,
            key: RequirementKey::new(row.key),
            kind: row.definition.0,
            is_required: row.is_required,
            sort_order: row.sort_order,
        }
    }
}

/// Reads the catalog tables into a validated [`Catalog`].
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<Catalog, StoreError> {
        let categories: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM service_categories")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        let services: Vec<ServiceRow> = sqlx::query_as(
            r"
            SELECT id, category_id, slug, name, description, base_price_cents,
                   estimated_duration, max_concurrent_bookings, is_active
            FROM services
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let requirements: Vec<RequirementRow> = sqlx::query_as(
            r"
            SELECT id, service_id, label, key, definition, is_required, sort_order
            FROM service_requirements
            ORDER BY service_id, sort_order, id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let categories = categories
            .into_iter()
            .map(|row| ServiceCategory {
                id: CategoryId::new(row.id),
                name: row.name,
                slug: row.slug,
            })
            .collect();
        let services = services
            .into_iter()
            .map(ServiceRow::into_service)
            .collect::<Result<Vec<_>, _>>()?;
        let requirements = requirements.into_iter().map(ServiceRequirement::from).collect();

        Catalog::new(categories, services, requirements).map_err(|e| {
            tracing::error!(error = %e, "Stored catalog is inconsistent");
            StoreError::Serialization(e.to_string())
        })
    }
}

impl CatalogStore for PostgresCatalogStore {
    fn load_catalog(&self) -> BoxFuture<'_, Result<Catalog, StoreError>> {
        Box::pin(self.load())
    }
}
