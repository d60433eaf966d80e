use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use letgo_core::repository::{BookingInsert, BookingRepository, CancelOutcome};
use letgo_core::{Booking, BookingStatus, RepoError};

use crate::database::is_unique_violation;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    rider_id: Uuid,
    driver_assignment_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepoError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            trip_id: row.trip_id,
            rider_id: row.rider_id,
            driver_assignment_id: row.driver_assignment_id,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "id, trip_id, rider_id, driver_assignment_id, status, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_active_booking(
        &self,
        trip_id: Uuid,
        rider_id: Uuid,
    ) -> Result<Option<Booking>, RepoError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE trip_id = $1 AND rider_id = $2 AND status = 'confirmed'"
        ))
        .bind(trip_id)
        .bind(rider_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<BookingInsert, RepoError> {
        let result = sqlx::query(
            "INSERT INTO bookings (id, trip_id, rider_id, driver_assignment_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.rider_id)
        .bind(booking.driver_assignment_id)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(BookingInsert::Created),
            // uq_bookings_active_rider
            Err(e) if is_unique_violation(&e) => Ok(BookingInsert::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<CancelOutcome, RepoError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'confirmed' RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(BookingStatus::Cancelled.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(CancelOutcome::Cancelled(row.try_into()?));
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match exists {
            Some(_) => CancelOutcome::AlreadyCancelled,
            None => CancelOutcome::Missing,
        })
    }

    async fn reinstate_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>, RepoError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'cancelled' RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(BookingStatus::Confirmed.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }
}
