use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use letgo_auth::IdentitySummary;
use letgo_core::{Identity, NewIdentity, Vehicle};

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
    #[serde(flatten)]
    pub vehicle: Vehicle,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_otp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone_number: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub message: &'static str,
    pub token: String,
    pub user: IdentitySummary,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verifyOtp", post(verify_otp))
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;
    let new_identity = NewIdentity::registration(
        req.name.as_deref(),
        req.last_name.as_deref(),
        req.phone_number.as_deref(),
        req.role.as_deref(),
        req.vehicle,
    )
    .map_err(letgo_auth::AuthError::from)?;

    let user = state.authenticator.register(new_identity).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { message: "User registered successfully.", user }),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;
    let challenge = state
        .authenticator
        .start_login(req.phone_number.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(LoginResponse {
        message: "OTP sent successfully.",
        user_id: challenge.identity_id,
        dev_otp: challenge.dev_code,
    }))
}

async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let Json(req) = payload?;
    let session = state
        .authenticator
        .complete_login(
            req.phone_number.as_deref().unwrap_or_default(),
            req.otp.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(VerifyOtpResponse {
        message: "OTP verified. Login successful.",
        token: session.token,
        user: session.user,
    }))
}
