use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use letgo_core::repository::ChallengeRepository;
use letgo_core::{ChallengeState, PendingChallenge, RepoError};

pub struct PgChallengeRepository {
    pool: PgPool,
}

impl PgChallengeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    code_digest: String,
    salt: String,
    expires_at: DateTime<Utc>,
    attempts: i32,
    last_sent_at: DateTime<Utc>,
}

impl From<ChallengeRow> for PendingChallenge {
    fn from(row: ChallengeRow) -> Self {
        PendingChallenge {
            code_digest: row.code_digest,
            salt: row.salt,
            expires_at: row.expires_at,
            attempts: row.attempts.max(0) as u32,
            last_sent_at: row.last_sent_at,
        }
    }
}

#[async_trait]
impl ChallengeRepository for PgChallengeRepository {
    async fn load_challenge(&self, identity_id: Uuid) -> Result<ChallengeState, RepoError> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            "SELECT code_digest, salt, expires_at, attempts, last_sent_at \
             FROM otp_challenges WHERE identity_id = $1",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => ChallengeState::Pending(row.into()),
            None => ChallengeState::None,
        })
    }

    async fn store_challenge(
        &self,
        identity_id: Uuid,
        challenge: &PendingChallenge,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO otp_challenges (identity_id, code_digest, salt, expires_at, attempts, last_sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (identity_id) DO UPDATE SET \
                 code_digest = EXCLUDED.code_digest, \
                 salt = EXCLUDED.salt, \
                 expires_at = EXCLUDED.expires_at, \
                 attempts = EXCLUDED.attempts, \
                 last_sent_at = EXCLUDED.last_sent_at",
        )
        .bind(identity_id)
        .bind(&challenge.code_digest)
        .bind(&challenge.salt)
        .bind(challenge.expires_at)
        .bind(challenge.attempts as i32)
        .bind(challenge.last_sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_failed_attempt(&self, identity_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE otp_challenges SET attempts = attempts + 1 WHERE identity_id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_challenge(&self, identity_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM otp_challenges WHERE identity_id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
