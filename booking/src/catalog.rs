//! Catalog read side.

use crate::error::{BookingError, ValidationError, ValidationErrors};
use autoshop_core::catalog::{Catalog, Service, ServiceCategory, ServiceRequirement};
use autoshop_core::ids::ServiceId;
use autoshop_core::store::CatalogStore;
use serde::Serialize;
use std::sync::Arc;

/// A service as the public catalog shows it: with its category and its
/// requirements in display order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    /// The service
    #[serde(flatten)]
    pub service: Service,
    /// Its category
    pub category: Option<ServiceCategory>,
    /// Its requirements, sorted by `sortOrder`
    pub requirements: Vec<ServiceRequirement>,
}

impl ServiceView {
    fn new(catalog: &Catalog, service: &Service) -> Self {
        Self {
            service: service.clone(),
            category: catalog.category(service.category_id).cloned(),
            requirements: catalog.requirements(service.id).to_vec(),
        }
    }
}

/// The active services among `ids`, in request order. Every unknown or
/// inactive id is recorded as [`ValidationError::UnknownService`].
pub(crate) fn bookable_services<'a>(
    catalog: &'a Catalog,
    ids: &[ServiceId],
    errors: &mut ValidationErrors,
) -> Vec<&'a Service> {
    let mut services = Vec::with_capacity(ids.len());
    for id in ids {
        match catalog.active_service(*id) {
            Some(service) => services.push(service),
            None => errors.push(ValidationError::UnknownService(*id)),
        }
    }
    services
}

/// Read-only access to the bookable catalog.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    /// Catalog backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Loads a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] when the store fails.
    pub async fn snapshot(&self) -> Result<Catalog, BookingError> {
        Ok(self.store.load_catalog().await?)
    }

    /// Active services, by category name then service name.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] when the store fails.
    pub async fn list_active_services(&self) -> Result<Vec<ServiceView>, BookingError> {
        let catalog = self.snapshot().await?;
        Ok(catalog
            .active_services()
            .into_iter()
            .map(|service| ServiceView::new(&catalog, service))
            .collect())
    }

    /// One active service by slug.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] when no active service has `slug`.
    pub async fn get_service(&self, slug: &str) -> Result<ServiceView, BookingError> {
        let catalog = self.snapshot().await?;
        catalog
            .active_service_by_slug(slug)
            .map(|service| ServiceView::new(&catalog, service))
            .ok_or_else(|| BookingError::NotFound {
                entity: "service",
                id: slug.to_string(),
            })
    }

    /// Requirements of an active service, by `sortOrder`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for unknown or inactive services.
    pub async fn list_requirements(
        &self,
        service_id: ServiceId,
    ) -> Result<Vec<ServiceRequirement>, BookingError> {
        let catalog = self.snapshot().await?;
        if catalog.active_service(service_id).is_none() {
            return Err(BookingError::NotFound {
                entity: "service",
                id: service_id.to_string(),
            });
        }
        Ok(catalog.requirements(service_id).to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use autoshop_testing::fixtures::{BRAKE_INSPECTION, ENGINE_DIAGNOSTICS};
    use autoshop_testing::stores::InMemoryCatalogStore;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalogStore::demo().unwrap()))
    }

    #[tokio::test]
    async fn test_lists_active_services_by_category_then_name() {
        let names: Vec<String> = service()
            .list_active_services()
            .await
            .unwrap()
            .into_iter()
            .map(|view| view.service.name)
            .collect();
        // Inspection, Maintenance, Tires & Wheels
        assert_eq!(names, ["Brake Inspection", "Oil Change", "Tire Rotation"]);
    }

    #[tokio::test]
    async fn test_get_service_by_slug() {
        let catalog = service();
        let view = catalog.get_service("oil-change").await.unwrap();
        assert_eq!(view.requirements.len(), 3);
        assert_eq!(view.category.unwrap().name, "Maintenance");

        let missing = catalog.get_service("engine-diagnostics").await.unwrap_err();
        assert!(matches!(missing, BookingError::NotFound { entity: "service", .. }));
    }

    #[tokio::test]
    async fn test_requirements_sorted_and_inactive_hidden() {
        let catalog = service();
        let orders: Vec<i32> = catalog
            .list_requirements(BRAKE_INSPECTION)
            .await
            .unwrap()
            .iter()
            .map(|r| r.sort_order)
            .collect();
        assert_eq!(orders, [1, 2, 3, 4]);
        assert!(catalog.list_requirements(ENGINE_DIAGNOSTICS).await.is_err());
    }

    #[tokio::test]
    async fn test_view_serializes_flat() {
        let view = service().get_service("tire-rotation").await.unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["slug"], "tire-rotation");
        assert_eq!(json["maxConcurrentBookings"], 1);
        assert_eq!(json["basePrice"], "30.00");
        assert_eq!(json["requirements"][0]["type"], "text");
    }
}
