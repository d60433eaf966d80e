use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use letgo_core::identity::normalize_phone;
use letgo_core::repository::{IdentityInsert, IdentityRepository};
use letgo_core::{Clock, Delivery, Identity, NewIdentity, OtpNotifier, Role};
use letgo_shared::MaskedPhone;

use crate::otp::OtpSessionStore;
use crate::token::TokenIssuer;
use crate::AuthError;

/// Outcome of a login request: a code is on its way.
#[derive(Debug, Clone)]
pub struct LoginChallenge {
    pub identity_id: Uuid,
    pub delivery: Delivery,
    /// Only set when delivery was simulated (development).
    pub dev_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Role,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name.clone(),
            last_name: identity.last_name.clone(),
            phone_number: identity.phone_number.clone(),
            role: identity.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user: IdentitySummary,
}

/// Phone number → challenge → verified session.
///
/// There is no persisted "in progress" state beyond the challenge itself: abandoning a
/// login just lets the challenge expire.
pub struct Authenticator {
    identities: Arc<dyn IdentityRepository>,
    otp: OtpSessionStore,
    notifier: Arc<dyn OtpNotifier>,
    tokens: TokenIssuer,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        otp: OtpSessionStore,
        notifier: Arc<dyn OtpNotifier>,
        tokens: TokenIssuer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { identities, otp, notifier, tokens, clock }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, new_identity: NewIdentity) -> Result<Identity, AuthError> {
        let identity = new_identity.into_identity(self.clock.now());

        match self.identities.create_identity(&identity).await? {
            IdentityInsert::Created => {
                info!(id = %identity.id, role = %identity.role, phone = %MaskedPhone(&identity.phone_number), "Identity registered");
                Ok(identity)
            }
            IdentityInsert::DuplicatePhone => Err(AuthError::DuplicatePhone),
        }
    }

    pub async fn start_login(&self, phone_number: &str) -> Result<LoginChallenge, AuthError> {
        let phone_number = required_phone(phone_number)?;

        let identity = self
            .identities
            .find_by_phone(&phone_number)
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        let issued = self.otp.issue(identity.id).await?;

        let delivery = self
            .notifier
            .send(&identity.phone_number, issued.code.expose())
            .await
            .map_err(|e| {
                error!(id = %identity.id, "OTP delivery failed: {}", e);
                AuthError::from(e)
            })?;

        Ok(LoginChallenge {
            identity_id: identity.id,
            delivery,
            dev_code: (delivery == Delivery::Simulated).then(|| issued.code.into_inner()),
        })
    }

    pub async fn complete_login(
        &self,
        phone_number: &str,
        supplied_code: &str,
    ) -> Result<LoginSession, AuthError> {
        let phone_number = required_phone(phone_number)?;
        if supplied_code.trim().is_empty() {
            return Err(AuthError::Validation("otp".to_string()));
        }

        // An unknown number looks exactly like a number with nothing pending.
        let identity = self
            .identities
            .find_by_phone(&phone_number)
            .await?
            .ok_or(AuthError::NoChallenge)?;

        let verified = self.otp.verify(identity.id, supplied_code.trim()).await?;
        let token = self.tokens.issue(&identity, verified.verified_at)?;

        info!(id = %identity.id, role = %identity.role, "Login successful");

        Ok(LoginSession { token, user: IdentitySummary::from(&identity) })
    }
}

fn required_phone(raw: &str) -> Result<String, AuthError> {
    if raw.trim().is_empty() {
        return Err(AuthError::Validation("phoneNumber".to_string()));
    }
    // Lookups go by the canonical form; anything that is not E.164 cannot be registered.
    Ok(normalize_phone(raw).unwrap_or_else(|_| raw.trim().to_string()))
}
