//! Application wiring: stores in, engine services out.

use crate::admission::BookingService;
use crate::availability::AvailabilityCalculator;
use crate::catalog::CatalogService;
use crate::config::{BookingConfig, Config, PostgresConfig, StoreBackend};
use crate::error::BookingError;
use crate::lifecycle::LifecycleService;
use crate::notification::NotificationDispatcher;
use crate::settings::{SettingsCache, SettingsService};
use autoshop_core::catalog::CatalogError;
use autoshop_core::customer::StaffUser;
use autoshop_core::environment::Clock;
use autoshop_core::ids::UserId;
use autoshop_core::notify::BookingNotifier;
use autoshop_core::store::{
    AppointmentStore, CatalogStore, CustomerStore, SettingsStore, StaffStore, StoreError,
};
use autoshop_postgres::{PoolOptions, PostgresStores};
use autoshop_testing::fixtures;
use autoshop_testing::stores::{
    InMemoryAppointmentStore, InMemoryCatalogStore, InMemoryCustomerStore, InMemorySettingsStore,
    InMemoryStaffStore,
};
use std::sync::Arc;
use std::time::Duration;

/// One implementation of every storage trait.
#[derive(Clone)]
pub struct Stores {
    /// Service catalog
    pub catalog: Arc<dyn CatalogStore>,
    /// Shop setting
    pub settings: Arc<dyn SettingsStore>,
    /// Appointments and capacity admission
    pub appointments: Arc<dyn AppointmentStore>,
    /// Customers and vehicles
    pub customers: Arc<dyn CustomerStore>,
    /// Staff users
    pub staff: Arc<dyn StaffStore>,
}

impl Stores {
    /// In-process stores seeded with the demo catalog, setting and staff.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the demo catalog is inconsistent.
    pub fn in_memory() -> Result<Self, CatalogError> {
        Ok(Self {
            catalog: Arc::new(InMemoryCatalogStore::demo()?),
            settings: Arc::new(InMemorySettingsStore::new(fixtures::setting())),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            customers: Arc::new(InMemoryCustomerStore::new()),
            staff: Arc::new(InMemoryStaffStore::new(fixtures::staff())),
        })
    }

    /// `PostgreSQL` stores; runs pending migrations first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when connecting or migrating fails.
    pub async fn postgres(config: &PostgresConfig) -> Result<Self, StoreError> {
        let options = PoolOptions {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout: Duration::from_secs(config.connect_timeout),
        };
        let stores = PostgresStores::connect(&config.url, &options).await?;
        stores.migrate().await?;
        Ok(Self {
            catalog: Arc::new(stores.catalog()),
            settings: Arc::new(stores.settings()),
            appointments: Arc::new(stores.appointments()),
            customers: Arc::new(stores.customers()),
            staff: Arc::new(stores.staff()),
        })
    }

    /// Stores for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be set up.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.store {
            StoreBackend::Memory => Ok(Self::in_memory()?),
            StoreBackend::Postgres => Ok(Self::postgres(&config.postgres).await?),
        }
    }
}

/// The booking engine's services, sharing one settings cache.
#[derive(Clone)]
pub struct BookingApp {
    /// Catalog reads
    pub catalog: CatalogService,
    /// Slot availability
    pub availability: AvailabilityCalculator,
    /// Admission controller
    pub booking: BookingService,
    /// Appointment reads and status changes
    pub lifecycle: LifecycleService,
    /// Setting reads and writes
    pub settings: SettingsService,
    staff: Arc<dyn StaffStore>,
    settings_cache: Arc<SettingsCache>,
}

impl BookingApp {
    /// Wires the services over `stores`.
    #[must_use]
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn BookingNotifier>,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        let slot_length = config.slot_length();
        let settings_cache = Arc::new(SettingsCache::new(
            stores.settings,
            Arc::clone(&clock),
            config.settings_ttl(),
        ));
        let notifications = NotificationDispatcher::new(
            notifier,
            Arc::clone(&stores.staff),
            config.retry_policy(),
        );

        Self {
            catalog: CatalogService::new(Arc::clone(&stores.catalog)),
            availability: AvailabilityCalculator::new(
                Arc::clone(&stores.catalog),
                Arc::clone(&stores.appointments),
                Arc::clone(&settings_cache),
                Arc::clone(&clock),
                slot_length,
                config.max_availability_days,
            ),
            booking: BookingService::new(
                stores.catalog,
                Arc::clone(&stores.appointments),
                stores.customers,
                Arc::clone(&settings_cache),
                notifications,
                Arc::clone(&clock),
                slot_length,
            ),
            lifecycle: LifecycleService::new(stores.appointments, clock),
            settings: SettingsService::new(Arc::clone(&settings_cache)),
            staff: stores.staff,
            settings_cache,
        }
    }

    /// Makes `user_id` the only staff member receiving booking mail.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for an unknown user.
    pub async fn assign_mail_recipient(&self, user_id: UserId) -> Result<StaffUser, BookingError> {
        let user = self.staff.assign_mail_recipient(user_id).await?;
        tracing::info!(%user_id, email = %user.email, "Mail recipient assigned");
        Ok(user)
    }

    /// Readiness probe: the setting can be read from its store.
    ///
    /// # Errors
    ///
    /// Returns the store error when the probe fails.
    pub async fn ready(&self) -> Result<(), StoreError> {
        self.settings_cache.probe().await
    }
}
