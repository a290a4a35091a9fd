//! Appointments and the per-slot admission critical section.

use crate::{cents_to_money, db_error, money_to_cents};
use autoshop_core::appointment::{Answers, Appointment, AppointmentStatus, NewAppointment, StatusChange};
use autoshop_core::capacity::SlotLimits;
use autoshop_core::ids::{AppointmentId, CustomerId, ServiceId, VehicleId};
use autoshop_core::schedule::Slot;
use autoshop_core::store::{AppointmentStore, BoxFuture, OccupiedSlot, StoreError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;

const SELECT_APPOINTMENT: &str = r"
    SELECT a.id, a.customer_id, a.vehicle_id, a.appointment_date, a.appointment_time,
           a.status, a.estimated_price_cents, a.final_price_cents, a.notes,
           a.service_requirements, a.created_at, a.updated_at,
           ARRAY(
               SELECT s.service_id FROM appointment_service s
               WHERE s.appointment_id = a.id
               ORDER BY s.position
           ) AS service_ids
    FROM appointments a
    WHERE a.id = $1
";

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: i64,
    customer_id: i64,
    vehicle_id: i64,
    appointment_date: NaiveDate,
    appointment_time: NaiveTime,
    status: String,
    estimated_price_cents: i64,
    final_price_cents: Option<i64>,
    notes: Option<String>,
    service_requirements: Json<BTreeMap<ServiceId, Answers>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    service_ids: Vec<i64>,
}

impl AppointmentRow {
    fn into_appointment(self) -> Result<Appointment, StoreError> {
        let status: AppointmentStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Serialization(format!("appointment {}: {e}", self.id)))?;
        Ok(Appointment {
            id: AppointmentId::new(self.id),
            customer_id: CustomerId::new(self.customer_id),
            vehicle_id: VehicleId::new(self.vehicle_id),
            service_ids: self.service_ids.into_iter().map(ServiceId::new).collect(),
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            status,
            estimated_price: cents_to_money("appointments.estimated_price_cents", self.estimated_price_cents)?,
            final_price: self
                .final_price_cents
                .map(|cents| cents_to_money("appointments.final_price_cents", cents))
                .transpose()?,
            notes: self.notes,
            service_requirements: self.service_requirements.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Appointment store backed by the `appointments` and `appointment_service`
/// tables.
///
/// Admissions and status changes for the same slot serialize on a
/// transaction-scoped advisory lock keyed by [`Slot::lock_key`].
#[derive(Clone)]
pub struct PostgresAppointmentStore {
    pool: PgPool,
}

impl PostgresAppointmentStore {
    /// Store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_slot(conn: &mut PgConnection, slot: Slot) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(slot.lock_key())
            .execute(conn)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn admit_inner(
        &self,
        new: NewAppointment,
        limits: SlotLimits,
    ) -> Result<Appointment, StoreError> {
        let slot = new.slot;
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        Self::lock_slot(&mut tx, slot).await?;

        let occupants: Vec<Vec<i64>> = sqlx::query_scalar(
            r"
            SELECT ARRAY(
                SELECT s.service_id FROM appointment_service s
                WHERE s.appointment_id = a.id
            )
            FROM appointments a
            WHERE a.appointment_date = $1
              AND a.appointment_time = $2
              AND a.status <> 'cancelled'
            ",
        )
        .bind(slot.date)
        .bind(slot.time)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;

        let occupants: Vec<Vec<ServiceId>> = occupants
            .into_iter()
            .map(|ids| ids.into_iter().map(ServiceId::new).collect())
            .collect();
        if let Err(reason) = limits.admits(occupants.iter().map(Vec::as_slice)) {
            tracing::debug!(%slot, %reason, "Admission refused");
            return Err(StoreError::CapacityExceeded { slot, reason });
        }

        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO appointments
                (customer_id, vehicle_id, appointment_date, appointment_time, status,
                 estimated_price_cents, notes, service_requirements, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'scheduled', $5, $6, $7, $8, $8)
            RETURNING id
            ",
        )
        .bind(new.customer_id.get())
        .bind(new.vehicle_id.get())
        .bind(slot.date)
        .bind(slot.time)
        .bind(money_to_cents(new.estimated_price)?)
        .bind(new.notes.as_deref())
        .bind(Json(&new.service_requirements))
        .bind(new.requested_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let service_ids: Vec<i64> = new.service_ids.iter().map(ServiceId::get).collect();
        sqlx::query(
            r"
            INSERT INTO appointment_service (appointment_id, service_id, position)
            SELECT $1, t.service_id, (t.ord - 1)::smallint
            FROM UNNEST($2::bigint[]) WITH ORDINALITY AS t(service_id, ord)
            ",
        )
        .bind(id)
        .bind(&service_ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        metrics::counter!("autoshop_postgres_admissions_total").increment(1);
        tracing::debug!(appointment_id = id, %slot, "Appointment inserted");
        Ok(new.into_appointment(AppointmentId::new(id)))
    }

    async fn occupancy_inner(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<OccupiedSlot>, StoreError> {
        let rows: Vec<(NaiveDate, NaiveTime, Vec<i64>)> = sqlx::query_as(
            r"
            SELECT a.appointment_date, a.appointment_time,
                   ARRAY(
                       SELECT s.service_id FROM appointment_service s
                       WHERE s.appointment_id = a.id
                       ORDER BY s.position
                   )
            FROM appointments a
            WHERE a.appointment_date BETWEEN $1 AND $2
              AND a.status <> 'cancelled'
            ORDER BY a.appointment_date, a.appointment_time, a.id
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(date, time, ids)| OccupiedSlot {
                slot: Slot::new(date, time),
                service_ids: ids.into_iter().map(ServiceId::new).collect(),
            })
            .collect())
    }

    async fn get_inner(&self, id: AppointmentId) -> Result<Appointment, StoreError> {
        let row: Option<AppointmentRow> = sqlx::query_as(SELECT_APPOINTMENT)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.ok_or_else(|| StoreError::not_found("appointment", id))?
            .into_appointment()
    }

    async fn transition_inner(
        &self,
        id: AppointmentId,
        change: StatusChange,
    ) -> Result<Appointment, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let query = format!("{SELECT_APPOINTMENT} FOR UPDATE OF a");
        let row: Option<AppointmentRow> = sqlx::query_as(&query)
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let current = row
            .ok_or_else(|| StoreError::not_found("appointment", id))?
            .into_appointment()?;

        Self::lock_slot(&mut tx, current.slot()).await?;
        let updated = change.apply(current)?;

        let final_price = updated.final_price.map(money_to_cents).transpose()?;
        sqlx::query(
            r"
            UPDATE appointments
            SET status = $2, final_price_cents = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(id.get())
        .bind(updated.status.as_str())
        .bind(final_price)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(appointment_id = %id, status = %updated.status, "Appointment status updated");
        Ok(updated)
    }
}

impl AppointmentStore for PostgresAppointmentStore {
    fn admit(
        &self,
        appointment: NewAppointment,
        limits: SlotLimits,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(self.admit_inner(appointment, limits))
    }

    fn occupancy(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<OccupiedSlot>, StoreError>> {
        Box::pin(self.occupancy_inner(from, to))
    }

    fn get(&self, id: AppointmentId) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(self.get_inner(id))
    }

    fn transition(
        &self,
        id: AppointmentId,
        change: StatusChange,
    ) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(self.transition_inner(id, change))
    }
}
