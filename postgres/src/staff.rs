//! Staff users and the booking mail recipient.

use crate::db_error;
use autoshop_core::customer::StaffUser;
use autoshop_core::ids::UserId;
use autoshop_core::store::{BoxFuture, StaffStore, StoreError};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    receive_mail: bool,
}

impl From<UserRow> for StaffUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            receive_mail: row.receive_mail,
        }
    }
}

/// Staff store over the `users` table.
#[derive(Clone)]
pub struct PostgresStaffStore {
    pool: PgPool,
}

impl PostgresStaffStore {
    /// Store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assign(&self, user_id: UserId) -> Result<StaffUser, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Self-conflicting mode: concurrent assignments run one at a time.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if exists.is_none() {
            return Err(StoreError::not_found("user", user_id));
        }

        // Clear before set; the partial unique index is checked per row.
        sqlx::query("UPDATE users SET receive_mail = FALSE WHERE receive_mail AND id <> $1")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let row: UserRow = sqlx::query_as(
            "UPDATE users SET receive_mail = TRUE WHERE id = $1 RETURNING id, name, email, receive_mail",
        )
        .bind(user_id.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(%user_id, "Mail recipient flag moved");
        Ok(row.into())
    }

    async fn recipient(&self) -> Result<Option<StaffUser>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email, receive_mail FROM users WHERE receive_mail")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(row.map(StaffUser::from))
    }
}

impl StaffStore for PostgresStaffStore {
    fn assign_mail_recipient(&self, user_id: UserId) -> BoxFuture<'_, Result<StaffUser, StoreError>> {
        Box::pin(self.assign(user_id))
    }

    fn mail_recipient(&self) -> BoxFuture<'_, Result<Option<StaffUser>, StoreError>> {
        Box::pin(self.recipient())
    }
}
