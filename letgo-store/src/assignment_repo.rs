use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use letgo_core::repository::{AssignmentRepository, SeatUpdate};
use letgo_core::{AssignmentListing, DriverAssignment, RepoError};

pub struct PgAssignmentRepository {
    pool: PgPool,
}

impl PgAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM driver_assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    trip_id: Uuid,
    driver_id: Uuid,
    area: String,
    available_seats: i32,
    created_at: DateTime<Utc>,
}

impl From<AssignmentRow> for DriverAssignment {
    fn from(row: AssignmentRow) -> Self {
        DriverAssignment {
            id: row.id,
            trip_id: row.trip_id,
            driver_id: row.driver_id,
            area: row.area,
            available_seats: row.available_seats,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    assignment: AssignmentRow,
    driver_name: String,
    driver_last_name: String,
}

#[async_trait]
impl AssignmentRepository for PgAssignmentRepository {
    async fn create_assignment(&self, assignment: &DriverAssignment) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO driver_assignments (id, trip_id, driver_id, area, available_seats, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(assignment.id)
        .bind(assignment.trip_id)
        .bind(assignment.driver_id)
        .bind(&assignment.area)
        .bind(assignment.available_seats)
        .bind(assignment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<DriverAssignment>, RepoError> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, trip_id, driver_id, area, available_seats, created_at \
             FROM driver_assignments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_available(
        &self,
        trip_id: Uuid,
        area: &str,
    ) -> Result<Vec<AssignmentListing>, RepoError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT a.id, a.trip_id, a.driver_id, a.area, a.available_seats, a.created_at, \
                    i.name AS driver_name, i.last_name AS driver_last_name \
             FROM driver_assignments a \
             JOIN identities i ON i.id = a.driver_id \
             WHERE a.trip_id = $1 AND a.area = $2 AND a.available_seats > 0 \
             ORDER BY a.created_at ASC",
        )
        .bind(trip_id)
        .bind(area)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AssignmentListing {
                assignment: row.assignment.into(),
                driver_name: row.driver_name,
                driver_last_name: row.driver_last_name,
            })
            .collect())
    }

    async fn decrement_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError> {
        // Check and write happen in one statement; concurrent callers serialize on the row lock.
        let updated: Option<(i32,)> = sqlx::query_as(
            "UPDATE driver_assignments SET available_seats = available_seats - 1 \
             WHERE id = $1 AND available_seats > 0 RETURNING available_seats",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some((available_seats,)) => Ok(SeatUpdate::Applied { available_seats }),
            None if self.exists(id).await? => Ok(SeatUpdate::Exhausted),
            None => Ok(SeatUpdate::Missing),
        }
    }

    async fn increment_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError> {
        let updated: Option<(i32,)> = sqlx::query_as(
            "UPDATE driver_assignments SET available_seats = available_seats + 1 \
             WHERE id = $1 RETURNING available_seats",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match updated {
            Some((available_seats,)) => SeatUpdate::Applied { available_seats },
            None => SeatUpdate::Missing,
        })
    }
}
