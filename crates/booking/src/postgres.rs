use async_trait::async_trait;
use chrono::NaiveDate;
use common::{AttemptToken, DateRange, HolderId, ReservationId, RoomId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{RepositoryError, Result};
use crate::repository::ReservationRepository;
use crate::reservation::{Reservation, ReservationStatus};

const COLUMNS: &str =
    "id, holder, room_id, start_date, end_date, status, attempt_token, created_at, version";

/// PostgreSQL-backed reservation store.
#[derive(Clone)]
pub struct PostgresReservationRepository {
    pool: PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        let dates =
            DateRange::new(start, end).map_err(|e| RepositoryError::CorruptRow(e.to_string()))?;
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<ReservationStatus>()
            .map_err(|e| RepositoryError::CorruptRow(e.to_string()))?;

        Ok(Reservation::restore(
            ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            HolderId::new(row.try_get::<String, _>("holder")?),
            RoomId::new(row.try_get("room_id")?),
            dates,
            status,
            AttemptToken::new(row.try_get::<String, _>("attempt_token")?),
            row.try_get("created_at")?,
            row.try_get("version")?,
        ))
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, holder, room_id, start_date, end_date, status, attempt_token, created_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.holder().as_str())
        .bind(reservation.room_id().as_i64())
        .bind(reservation.dates().start())
        .bind(reservation.dates().end())
        .bind(reservation.status().as_str())
        .bind(reservation.attempt().as_str())
        .bind(reservation.created_at())
        .bind(reservation.version())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Duplicate(reservation.id());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM reservations WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn update(&self, reservation: &Reservation) -> Result<Reservation> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1, version = version + 1
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(reservation.status().as_str())
        .bind(reservation.id().as_uuid())
        .bind(reservation.version())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM reservations WHERE id = $1")
                    .bind(reservation.id().as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match actual {
                Some(actual) => RepositoryError::ConcurrencyConflict {
                    reservation_id: reservation.id(),
                    expected: reservation.version(),
                    actual,
                },
                None => RepositoryError::NotFound(reservation.id()),
            });
        }

        tx.commit().await?;
        Ok(reservation.clone().with_version(reservation.version() + 1))
    }

    async fn find_by_room(
        &self,
        room_id: RoomId,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE room_id = $1 AND status = ANY($2) ORDER BY created_at ASC"
        ))
        .bind(room_id.as_i64())
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn find_by_holder(&self, holder: &HolderId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE holder = $1 ORDER BY created_at ASC"
        ))
        .bind(holder.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }
}
