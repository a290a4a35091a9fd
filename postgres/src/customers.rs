//! Customer and vehicle resolution.

use crate::db_error;
use autoshop_core::customer::{Customer, CustomerDetails, Vehicle, VehicleDetails};
use autoshop_core::ids::{CustomerId, VehicleId};
use autoshop_core::store::{BoxFuture, CustomerStore, StoreError};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    full_name: String,
    phone: String,
    email: String,
    sms_updates: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::new(row.id),
            details: CustomerDetails {
                full_name: row.full_name,
                phone: row.phone,
                email: row.email,
                sms_updates: row.sms_updates,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    customer_id: i64,
    #[sqlx(rename = "type")]
    vehicle_type: String,
    make: String,
    model: String,
    year: i32,
    vin: Option<String>,
    tire_size: Option<String>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: VehicleId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            details: VehicleDetails {
                vehicle_type: row.vehicle_type,
                make: row.make,
                model: row.model,
                year: row.year,
                vin: row.vin,
                tire_size: row.tire_size,
            },
        }
    }
}

/// Customers keyed by case-insensitive e-mail, with their vehicles.
#[derive(Clone)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    /// Store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_customer(
        &self,
        details: CustomerDetails,
        at: DateTime<Utc>,
    ) -> Result<Customer, StoreError> {
        let row: CustomerRow = sqlx::query_as(
            r"
            INSERT INTO customers (full_name, phone, email, sms_updates, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT ((lower(email))) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                sms_updates = EXCLUDED.sms_updates,
                updated_at = EXCLUDED.updated_at
            RETURNING id, full_name, phone, email, sms_updates, created_at, updated_at
            ",
        )
        .bind(&details.full_name)
        .bind(&details.phone)
        .bind(details.email.trim())
        .bind(details.sms_updates)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn find_or_create_vehicle(
        &self,
        customer_id: CustomerId,
        details: VehicleDetails,
    ) -> Result<Vehicle, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Serializes vehicle resolution per customer.
        let owner: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
            .bind(customer_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if owner.is_none() {
            return Err(StoreError::not_found("customer", customer_id));
        }

        let existing: Option<i64> = sqlx::query_scalar(
            r"
            SELECT id FROM vehicles
            WHERE customer_id = $1
              AND CASE
                    WHEN $2::text IS NOT NULL THEN upper(vin) = upper($2::text)
                    ELSE lower(type) = lower($3) AND lower(make) = lower($4)
                         AND lower(model) = lower($5) AND year = $6
                  END
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(customer_id.get())
        .bind(details.vin.as_deref())
        .bind(&details.vehicle_type)
        .bind(&details.make)
        .bind(&details.model)
        .bind(details.year)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let row: VehicleRow = match existing {
            Some(id) => {
                sqlx::query_as(
                    r"
                    UPDATE vehicles SET tire_size = $2
                    WHERE id = $1
                    RETURNING id, customer_id, type, make, model, year, vin, tire_size
                    ",
                )
                .bind(id)
                .bind(details.tire_size.as_deref())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?
            }
            None => {
                sqlx::query_as(
                    r"
                    INSERT INTO vehicles (customer_id, type, make, model, year, vin, tire_size)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, customer_id, type, make, model, year, vin, tire_size
                    ",
                )
                .bind(customer_id.get())
                .bind(&details.vehicle_type)
                .bind(&details.make)
                .bind(&details.model)
                .bind(details.year)
                .bind(details.vin.as_deref())
                .bind(details.tire_size.as_deref())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?
            }
        };

        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }
}

impl CustomerStore for PostgresCustomerStore {
    fn resolve_customer(
        &self,
        details: CustomerDetails,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Customer, StoreError>> {
        Box::pin(self.upsert_customer(details, at))
    }

    fn resolve_vehicle(
        &self,
        customer_id: CustomerId,
        details: VehicleDetails,
    ) -> BoxFuture<'_, Result<Vehicle, StoreError>> {
        Box::pin(self.find_or_create_vehicle(customer_id, details))
    }
}
