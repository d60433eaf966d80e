use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use letgo_core::repository::{IdentityInsert, IdentityRepository};
use letgo_core::{Identity, RepoError, Vehicle};

use crate::database::is_unique_violation;

pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    name: String,
    last_name: String,
    phone_number: String,
    role: String,
    car_model: Option<String>,
    car_color: Option<String>,
    car_plate: Option<String>,
    car_type: Option<String>,
    car_year: Option<String>,
    phone_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = RepoError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let vehicle = Vehicle {
            model: row.car_model,
            color: row.car_color,
            plate: row.car_plate,
            kind: row.car_type,
            year: row.car_year,
        };
        Ok(Identity {
            id: row.id,
            name: row.name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            role: row.role.parse()?,
            vehicle: (!vehicle.is_empty()).then_some(vehicle),
            phone_verified_at: row.phone_verified_at,
            created_at: row.created_at,
        })
    }
}

const SELECT_IDENTITY: &str = "SELECT id, name, last_name, phone_number, role, car_model, car_color, \
     car_plate, car_type, car_year, phone_verified_at, created_at FROM identities";

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create_identity(&self, identity: &Identity) -> Result<IdentityInsert, RepoError> {
        let vehicle = identity.vehicle.clone().unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO identities (id, name, last_name, phone_number, role, car_model, car_color, \
             car_plate, car_type, car_year, phone_verified_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(identity.id)
        .bind(&identity.name)
        .bind(&identity.last_name)
        .bind(&identity.phone_number)
        .bind(identity.role.as_str())
        .bind(vehicle.model)
        .bind(vehicle.color)
        .bind(vehicle.plate)
        .bind(vehicle.kind)
        .bind(vehicle.year)
        .bind(identity.phone_verified_at)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(IdentityInsert::Created),
            Err(e) if is_unique_violation(&e) => Ok(IdentityInsert::DuplicatePhone),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("{SELECT_IDENTITY} WHERE phone_number = $1"))
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Identity::try_from).transpose()
    }

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!("{SELECT_IDENTITY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Identity::try_from).transpose()
    }

    async fn mark_phone_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        sqlx::query("UPDATE identities SET phone_verified_at = $2 WHERE id = $1 AND phone_verified_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
