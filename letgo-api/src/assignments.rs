use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use letgo_auth::Claims;
use letgo_core::{AssignmentListing, DriverAssignment};

use crate::{
    error::{required_id, AppError},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub trip_id: Option<String>,
    pub area: Option<String>,
    pub available_seats: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub message: &'static str,
    pub assignment: DriverAssignment,
}

#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    pub area: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/driver-assignments", post(create_assignment))
        .route("/api/driver-assignments/{trip_id}", get(list_assignments))
}

async fn create_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateAssignmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AssignmentResponse>), AppError> {
    let Json(req) = payload?;
    let trip_id = required_id(req.trip_id.as_deref(), "tripId")?;

    let assignment = state
        .trips
        .create_assignment(
            claims.actor(),
            trip_id,
            req.area.as_deref().unwrap_or_default(),
            req.available_seats.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse { message: "Driver assignment created", assignment }),
    ))
}

async fn list_assignments(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    Query(query): Query<AreaQuery>,
) -> Result<Json<Vec<AssignmentListing>>, AppError> {
    let Path(trip_id) = path?;
    let listings = state.trips.list_available(trip_id, query.area.as_deref()).await?;
    Ok(Json(listings))
}
