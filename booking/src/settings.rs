//! Shop setting: a read-through cache with explicit invalidation, and the
//! admin write path.
//!
//! The cache is injected wherever the setting is read (availability,
//! admission) instead of living in global state. Writes go through
//! [`SettingsCache::write_through`], which holds the cache's write lock while
//! saving and clears the entry before returning, so no reader can observe
//! the old value once the write has succeeded.

use crate::error::{BookingError, ValidationError};
use crate::metrics;
use autoshop_core::environment::Clock;
use autoshop_core::schedule::{Setting, SettingError};
use autoshop_core::store::{SettingsStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct CachedSetting {
    setting: Arc<Setting>,
    loaded_at: DateTime<Utc>,
}

/// Read-through cache of the [`Setting`] singleton.
pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entry: RwLock<Option<CachedSetting>>,
}

impl SettingsCache {
    /// Default time-to-live of a cached setting.
    pub const DEFAULT_TTL: Duration = Duration::hours(1);

    /// Cache over `store` whose entries expire after `ttl`.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            entry: RwLock::new(None),
        }
    }

    fn fresh(&self, entry: &CachedSetting, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.loaded_at) < self.ttl
    }

    /// The current setting, loading it when absent or expired.
    ///
    /// # Errors
    ///
    /// Returns the store's error when a load is needed and fails.
    pub async fn get(&self) -> Result<Arc<Setting>, StoreError> {
        let now = self.clock.now();
        if let Some(entry) = self.entry.read().await.as_ref() {
            if self.fresh(entry, now) {
                metrics::record_settings_cache("hit");
                return Ok(Arc::clone(&entry.setting));
            }
        }

        let mut guard = self.entry.write().await;
        // Another reader may have reloaded while we waited for the lock.
        if let Some(entry) = guard.as_ref() {
            if self.fresh(entry, now) {
                metrics::record_settings_cache("hit");
                return Ok(Arc::clone(&entry.setting));
            }
        }

        metrics::record_settings_cache("miss");
        let setting = Arc::new(self.store.load_setting().await?);
        *guard = Some(CachedSetting {
            setting: Arc::clone(&setting),
            loaded_at: now,
        });
        tracing::debug!(timezone = %setting.timezone, "Setting loaded into cache");
        Ok(setting)
    }

    /// Saves `setting` and invalidates, under the cache's write lock.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the cache is left untouched in that case.
    pub async fn write_through(&self, setting: Setting) -> Result<(), StoreError> {
        let mut guard = self.entry.write().await;
        self.store.save_setting(setting).await?;
        *guard = None;
        metrics::record_settings_cache("invalidated");
        Ok(())
    }

    /// Loads straight from the store, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn probe(&self) -> Result<(), StoreError> {
        self.store.load_setting().await.map(|_| ())
    }
}

fn setting_error(error: &SettingError) -> ValidationError {
    let field = match error {
        SettingError::ZeroCapacity => "totalCapacity".to_string(),
        SettingError::IncompleteWeek => "workingHours".to_string(),
        SettingError::InvertedHours(day) => format!("workingHours.{day}"),
    };
    ValidationError::field(field, error.to_string())
}

/// Admin-facing setting operations.
#[derive(Clone)]
pub struct SettingsService {
    cache: Arc<SettingsCache>,
}

impl SettingsService {
    /// Service writing through `cache`.
    #[must_use]
    pub fn new(cache: Arc<SettingsCache>) -> Self {
        Self { cache }
    }

    /// The current (possibly cached) setting.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] when the setting cannot be loaded.
    pub async fn current(&self) -> Result<Arc<Setting>, BookingError> {
        Ok(self.cache.get().await?)
    }

    /// Validates and stores a new setting, invalidating the cache before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for an invalid setting and
    /// [`BookingError::Store`] when the write fails.
    pub async fn update(&self, setting: Setting) -> Result<Setting, BookingError> {
        if let Err(error) = setting.validate() {
            tracing::debug!(%error, "Setting rejected");
            return Err(setting_error(&error).into());
        }
        self.cache.write_through(setting.clone()).await?;
        tracing::info!(
            total_capacity = setting.total_capacity,
            timezone = %setting.timezone,
            "Setting updated"
        );
        Ok(setting)
    }
}
