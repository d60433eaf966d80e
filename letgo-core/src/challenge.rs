use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outstanding OTP for one identity. Only the salted digest of the code is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChallenge {
    pub code_digest: String,
    pub salt: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_sent_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }

    /// A challenge that can still authenticate someone.
    pub fn is_live(&self, now: DateTime<Utc>, max_attempts: u32) -> bool {
        !self.is_expired(now) && !self.is_exhausted(max_attempts)
    }

    /// Whole seconds left before another code may be sent, if the cooldown is still running.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown_seconds: u64) -> Option<u64> {
        let elapsed_ms = (now - self.last_sent_at).num_milliseconds().max(0) as u64;
        let cooldown_ms = cooldown_seconds.saturating_mul(1000);
        (elapsed_ms < cooldown_ms).then(|| cooldown_seconds - elapsed_ms / 1000)
    }
}

/// Per-identity challenge slot: either nothing is pending or exactly one challenge is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChallengeState {
    #[default]
    None,
    Pending(PendingChallenge),
}
