use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use letgo_core::Repositories;

use crate::assignment_repo::PgAssignmentRepository;
use crate::booking_repo::PgBookingRepository;
use crate::challenge_repo::PgChallengeRepository;
use crate::identity_repo::PgIdentityRepository;
use crate::trip_repo::PgTripRepository;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Every repository backed by this pool.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            identities: Arc::new(PgIdentityRepository::new(self.pool.clone())),
            challenges: Arc::new(PgChallengeRepository::new(self.pool.clone())),
            trips: Arc::new(PgTripRepository::new(self.pool.clone())),
            assignments: Arc::new(PgAssignmentRepository::new(self.pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(self.pool.clone())),
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
