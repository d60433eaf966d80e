use letgo_core::{CoreError, NotifierError, RepoError};

/// Everything the login flow can refuse with. Messages are safe to show to clients.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User with this phone number does not exist.")]
    UnknownIdentity,

    #[error("User with this phone number already exists.")]
    DuplicatePhone,

    #[error("Please wait {retry_after_seconds}s before requesting another code.")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Invalid request. Please login again.")]
    NoChallenge,

    #[error("OTP expired. Please request a new OTP.")]
    Expired,

    #[error("Too many attempts. Please request a new OTP.")]
    TooManyAttempts,

    #[error("Invalid OTP.")]
    InvalidCode,

    #[error("Invalid or missing field: {0}")]
    Validation(String),

    #[error("Invalid or expired session token")]
    InvalidToken,

    #[error("OTP delivery failed: {0}")]
    Delivery(#[from] NotifierError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(field) => AuthError::Validation(field),
            CoreError::InternalError(msg) => AuthError::Internal(msg),
        }
    }
}
