//! `PostgreSQL` storage for the autoshop booking engine.
//!
//! This crate implements every storage trait from `autoshop-core` on top of a
//! shared sqlx connection pool:
//!
//! - [`PostgresCatalogStore`]: service catalog snapshots
//! - [`PostgresSettingsStore`]: the singleton shop setting
//! - [`PostgresAppointmentStore`]: capacity admission and lifecycle updates
//! - [`PostgresCustomerStore`]: customer and vehicle resolution
//! - [`PostgresStaffStore`]: the booking mail recipient
//!
//! # Capacity
//!
//! Admission takes a transaction-scoped advisory lock keyed by the slot
//! (`pg_advisory_xact_lock(slot.lock_key())`), counts the slot's
//! non-cancelled appointments, and inserts inside the same transaction.
//! Admissions for different slots never wait on each other.
//!
//! # Example
//!
//! ```ignore
//! use autoshop_postgres::{PoolOptions, PostgresStores};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let stores = PostgresStores::connect("postgres://localhost/autoshop", &PoolOptions::default()).await?;
//!     stores.migrate().await?;
//!     let appointments = stores.appointments();
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod appointments;
mod catalog;
mod customers;
mod settings;
mod staff;

pub use appointments::PostgresAppointmentStore;
pub use catalog::PostgresCatalogStore;
pub use customers::PostgresCustomerStore;
pub use settings::PostgresSettingsStore;
pub use staff::PostgresStaffStore;

use autoshop_core::money::Money;
use autoshop_core::store::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// All stores over one connection pool.
#[derive(Clone)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    /// Connects a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn connect(database_url: &str, options: &PoolOptions) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Stores over an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Catalog store.
    #[must_use]
    pub fn catalog(&self) -> PostgresCatalogStore {
        PostgresCatalogStore::new(self.pool.clone())
    }

    /// Settings store.
    #[must_use]
    pub fn settings(&self) -> PostgresSettingsStore {
        PostgresSettingsStore::new(self.pool.clone())
    }

    /// Appointment store.
    #[must_use]
    pub fn appointments(&self) -> PostgresAppointmentStore {
        PostgresAppointmentStore::new(self.pool.clone())
    }

    /// Customer store.
    #[must_use]
    pub fn customers(&self) -> PostgresCustomerStore {
        PostgresCustomerStore::new(self.pool.clone())
    }

    /// Staff store.
    #[must_use]
    pub fn staff(&self) -> PostgresStaffStore {
        PostgresStaffStore::new(self.pool.clone())
    }
}

#[allow(clippy::needless_pass_by_value)] // used with map_err
pub(crate) fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

pub(crate) fn cents_to_money(column: &str, cents: i64) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Serialization(format!("negative amount in {column}: {cents}")))
}

pub(crate) fn money_to_cents(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.cents())
        .map_err(|_| StoreError::Serialization(format!("amount {money} out of range")))
}
