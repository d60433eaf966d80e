use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use letgo_core::codec::{self, DEFAULT_SALT_BYTES};
use letgo_core::repository::{ChallengeRepository, IdentityRepository};
use letgo_core::{ChallengeState, Clock, PendingChallenge};
use letgo_shared::Masked;

use crate::AuthError;

/// Tunables for the challenge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub ttl_seconds: u64,
    pub resend_cooldown_seconds: u64,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self { ttl_seconds: 300, resend_cooldown_seconds: 60, max_attempts: 5 }
    }
}

/// A freshly issued challenge. The raw code is only here for out-of-band delivery.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub code: Masked<String>,
    pub expires_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub identity_id: Uuid,
    pub verified_at: DateTime<Utc>,
}

/// Issues and checks one-time codes, one pending challenge per identity.
pub struct OtpSessionStore {
    challenges: Arc<dyn ChallengeRepository>,
    identities: Arc<dyn IdentityRepository>,
    clock: Arc<dyn Clock>,
    policy: OtpPolicy,
}

impl OtpSessionStore {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        identities: Arc<dyn IdentityRepository>,
        clock: Arc<dyn Clock>,
        policy: OtpPolicy,
    ) -> Self {
        Self { challenges, identities, clock, policy }
    }

    pub fn policy(&self) -> OtpPolicy {
        self.policy
    }

    /// Creates a new challenge, replacing any previous one, unless a live challenge was
    /// sent less than the cooldown ago.
    pub async fn issue(&self, identity_id: Uuid) -> Result<IssuedChallenge, AuthError> {
        let now = self.clock.now();

        if let ChallengeState::Pending(existing) = self.challenges.load_challenge(identity_id).await? {
            if existing.is_live(now, self.policy.max_attempts) {
                if let Some(retry_after_seconds) =
                    existing.cooldown_remaining(now, self.policy.resend_cooldown_seconds)
                {
                    warn!(%identity_id, retry_after_seconds, "OTP resend inside cooldown");
                    return Err(AuthError::RateLimited { retry_after_seconds });
                }
            }
        }

        let code = codec::generate_code();
        let salt = codec::generate_salt(DEFAULT_SALT_BYTES);
        let challenge = PendingChallenge {
            code_digest: codec::digest(&code, &salt)?,
            salt,
            expires_at: now + Duration::seconds(self.policy.ttl_seconds as i64),
            attempts: 0,
            last_sent_at: now,
        };

        self.challenges.store_challenge(identity_id, &challenge).await?;
        info!(%identity_id, expires_at = %challenge.expires_at, "OTP challenge issued");

        Ok(IssuedChallenge {
            code: Masked(code),
            expires_at: challenge.expires_at,
            last_sent_at: challenge.last_sent_at,
        })
    }

    /// Checks, in order: attempt cap, expiry, then the digest. Exhausted or expired
    /// challenges are purged before any comparison happens.
    pub async fn verify(&self, identity_id: Uuid, supplied_code: &str) -> Result<Verified, AuthError> {
        let now = self.clock.now();

        let challenge = match self.challenges.load_challenge(identity_id).await? {
            ChallengeState::None => return Err(AuthError::NoChallenge),
            ChallengeState::Pending(c) => c,
        };

        if challenge.is_exhausted(self.policy.max_attempts) {
            self.challenges.clear_challenge(identity_id).await?;
            warn!(%identity_id, "OTP challenge purged after too many attempts");
            return Err(AuthError::TooManyAttempts);
        }

        if challenge.is_expired(now) {
            self.challenges.clear_challenge(identity_id).await?;
            info!(%identity_id, "Expired OTP challenge purged");
            return Err(AuthError::Expired);
        }

        let supplied_digest = codec::digest(supplied_code, &challenge.salt)?;
        if !codec::constant_time_eq(&supplied_digest, &challenge.code_digest) {
            self.challenges.record_failed_attempt(identity_id).await?;
            warn!(%identity_id, attempts = challenge.attempts + 1, "Invalid OTP supplied");
            return Err(AuthError::InvalidCode);
        }

        self.challenges.clear_challenge(identity_id).await?;
        self.identities.mark_phone_verified(identity_id, now).await?;

        Ok(Verified { identity_id, verified_at: now })
    }
}
