use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use letgo_core::repository::TripRepository;
use letgo_core::{RepoError, Trip, TripStatus};

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    title: String,
    date: DateTime<Utc>,
    total_seats: i32,
    booked_seats: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = RepoError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        Ok(Trip {
            id: row.id,
            title: row.title,
            date: row.date,
            total_seats: row.total_seats,
            booked_seats: row.booked_seats,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

const TRIP_COLUMNS: &str = "id, title, date, total_seats, booked_seats, status, created_at";

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn create_trip(&self, trip: &Trip) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO trips (id, title, date, total_seats, booked_seats, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(trip.id)
        .bind(&trip.title)
        .bind(trip.date)
        .bind(trip.total_seats)
        .bind(trip.booked_seats)
        .bind(trip.status.as_str())
        .bind(trip.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, RepoError> {
        let row = sqlx::query_as::<_, TripRow>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Trip::try_from).transpose()
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RepoError> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY date ASC, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn set_trip_status(&self, id: Uuid, status: TripStatus) -> Result<Option<Trip>, RepoError> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "UPDATE trips SET status = $2 WHERE id = $1 RETURNING {TRIP_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Trip::try_from).transpose()
    }
}
