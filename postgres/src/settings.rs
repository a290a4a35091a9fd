//! The singleton shop setting.

use crate::db_error;
use autoshop_core::schedule::{Setting, WorkingDay};
use autoshop_core::store::{BoxFuture, SettingsStore, StoreError};
use chrono_tz::Tz;
use sqlx::types::Json;
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct SettingRow {
    total_capacity: i32,
    timezone: String,
    working_hours: Json<Vec<WorkingDay>>,
}

impl SettingRow {
    fn into_setting(self) -> Result<Setting, StoreError> {
        let total_capacity = u32::try_from(self.total_capacity).map_err(|_| {
            StoreError::Serialization(format!("invalid total_capacity {}", self.total_capacity))
        })?;
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|e| StoreError::Serialization(format!("invalid timezone: {e}")))?;
        Ok(Setting {
            total_capacity,
            timezone,
            working_hours: self.working_hours.0,
        })
    }
}

/// Reads and replaces the `settings` row.
#[derive(Clone)]
pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    /// Store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<Setting, StoreError> {
        let row: Option<SettingRow> = sqlx::query_as(
            "SELECT total_capacity, timezone, working_hours FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.ok_or_else(|| StoreError::not_found("setting", 1))?
            .into_setting()
    }

    async fn save(&self, setting: Setting) -> Result<(), StoreError> {
        let total_capacity = i32::try_from(setting.total_capacity).map_err(|_| {
            StoreError::Serialization(format!("total_capacity {} out of range", setting.total_capacity))
        })?;

        sqlx::query(
            r"
            INSERT INTO settings (id, total_capacity, timezone, working_hours, updated_at)
            VALUES (1, $1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE
            SET total_capacity = EXCLUDED.total_capacity,
                timezone = EXCLUDED.timezone,
                working_hours = EXCLUDED.working_hours,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(total_capacity)
        .bind(setting.timezone.name())
        .bind(Json(&setting.working_hours))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        tracing::debug!(total_capacity, timezone = setting.timezone.name(), "Setting saved");
        Ok(())
    }
}

impl SettingsStore for PostgresSettingsStore {
    fn load_setting(&self) -> BoxFuture<'_, Result<Setting, StoreError>> {
        Box::pin(self.load())
    }

    fn save_setting(&self, setting: Setting) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.save(setting))
    }
}
