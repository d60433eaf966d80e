use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use letgo_auth::Claims;
use letgo_core::Trip;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub total_seats: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub message: &'static str,
    pub trip: Trip,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/trips", get(list_trips).post(create_trip))
        .route("/api/trips/{id}/close", patch(close_trip))
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TripResponse>), AppError> {
    let Json(req) = payload?;
    let trip = state
        .trips
        .create_trip(
            claims.actor(),
            req.title.as_deref().unwrap_or_default(),
            req.date.as_deref().unwrap_or_default(),
            req.total_seats.unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TripResponse { message: "Trip created", trip })))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    Ok(Json(state.trips.list_trips().await?))
}

async fn close_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TripResponse>, AppError> {
    let Path(trip_id) = path?;
    let trip = state.trips.close_trip(claims.actor(), trip_id).await?;
    Ok(Json(TripResponse { message: "Trip closed", trip }))
}
