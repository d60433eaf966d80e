use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use letgo_auth::AuthError;
use letgo_booking::{BookingError, TripError};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    RateLimited { message: String, retry_after: Option<u64> },
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RateLimited { message, retry_after: secs } => {
                retry_after = secs;
                (StatusCode::TOO_MANY_REQUESTS, message)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        match retry_after {
            Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

/// Parses an id taken from a request body as a string, so a bad value reads like a missing one.
pub(crate) fn required_id(value: Option<&str>, field: &str) -> Result<Uuid, AppError> {
    value
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::ValidationError(format!("Invalid or missing field: {}", field)))
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::UnknownIdentity => AppError::NotFoundError(message),
            AuthError::RateLimited { retry_after_seconds } => AppError::RateLimited {
                message,
                retry_after: Some(retry_after_seconds),
            },
            AuthError::TooManyAttempts => AppError::RateLimited { message, retry_after: None },
            AuthError::NoChallenge
            | AuthError::Expired
            | AuthError::InvalidCode
            | AuthError::DuplicatePhone
            | AuthError::Validation(_) => AppError::ValidationError(message),
            AuthError::InvalidToken => AppError::AuthenticationError(message),
            AuthError::Delivery(_) | AuthError::Internal(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::TripUnavailable
            | BookingError::AssignmentNotFound
            | BookingError::SoldOut
            | BookingError::AlreadyBooked
            | BookingError::AlreadyCancelled => AppError::ValidationError(message),
            BookingError::NotFound => AppError::NotFoundError(message),
            BookingError::Forbidden => AppError::AuthorizationError(message),
            BookingError::Internal(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        let message = err.to_string();
        match err {
            TripError::NotFound => AppError::NotFoundError(message),
            TripError::Forbidden(_) => AppError::AuthorizationError(message),
            TripError::TripUnavailable | TripError::Validation(_) => AppError::ValidationError(message),
            TripError::Internal(_) => AppError::InternalServerError(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_sets_retry_after() {
        let response = AppError::from(AuthError::RateLimited { retry_after_seconds: 42 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(AuthError::UnknownIdentity), StatusCode::NOT_FOUND),
            (AppError::from(AuthError::InvalidCode), StatusCode::BAD_REQUEST),
            (AppError::from(AuthError::TooManyAttempts), StatusCode::TOO_MANY_REQUESTS),
            (AppError::from(AuthError::InvalidToken), StatusCode::UNAUTHORIZED),
            (AppError::from(BookingError::Forbidden), StatusCode::FORBIDDEN),
            (AppError::from(BookingError::NotFound), StatusCode::NOT_FOUND),
            (AppError::from(BookingError::SoldOut), StatusCode::BAD_REQUEST),
            (AppError::from(TripError::Forbidden("admin")), StatusCode::FORBIDDEN),
            (AppError::from(TripError::Internal("db down".into())), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_required_id() {
        let id = Uuid::new_v4();
        assert_eq!(required_id(Some(&id.to_string()), "tripId").unwrap(), id);

        for value in [None, Some("not-a-uuid"), Some("")] {
            match required_id(value, "tripId") {
                Err(AppError::ValidationError(msg)) => assert_eq!(msg, "Invalid or missing field: tripId"),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
