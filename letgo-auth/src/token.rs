use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use letgo_core::{Actor, Identity, Role};

use crate::AuthError;

/// Session token claims: who the caller is, the phone they proved, and their role.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub phone_number: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor { id: self.sub, role: self.role }
    }
}

/// Signs and checks HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiration_seconds: u64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, expiration_seconds: u64) -> Self {
        Self { secret: secret.into(), expiration_seconds }
    }

    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: identity.id,
            phone_number: identity.phone_number.clone(),
            role: identity.role,
            iat: now.timestamp() as usize,
            exp: (now + Duration::seconds(self.expiration_seconds as i64)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}
