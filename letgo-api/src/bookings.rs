use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use letgo_auth::Claims;
use letgo_core::Booking;

use crate::{
    error::{required_id, AppError},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSeatRequest {
    pub trip_id: Option<String>,
    pub driver_assignment_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: &'static str,
    pub booking: Booking,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(book_seat))
        .route("/api/bookings/{id}", delete(cancel_booking))
}

async fn book_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<BookSeatRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let Json(req) = payload?;
    let trip_id = required_id(req.trip_id.as_deref(), "tripId")?;
    let driver_assignment_id = required_id(req.driver_assignment_id.as_deref(), "driverAssignmentId")?;

    let booking = state.bookings.book(claims.sub, trip_id, driver_assignment_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse { message: "Seat booked", booking }),
    ))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookingResponse>, AppError> {
    let Path(booking_id) = path?;
    let booking = state.bookings.cancel(claims.sub, booking_id).await?;
    Ok(Json(BookingResponse { message: "Booking cancelled", booking }))
}
