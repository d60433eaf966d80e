use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use letgo_core::repository::{
    AssignmentRepository, BookingInsert, BookingRepository, CancelOutcome, TripRepository,
};
use letgo_core::{Booking, Clock};

use crate::ledger::SeatLedger;
use crate::{BookingError, InventoryError};

/// Ties a rider, a trip and a driver's seat pool together.
///
/// Per (trip, rider): no booking → confirmed → cancelled. A cancelled row stays for audit
/// and the rider may book the trip again, which creates a new row.
pub struct BookingManager {
    trips: Arc<dyn TripRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    bookings: Arc<dyn BookingRepository>,
    ledger: SeatLedger,
    clock: Arc<dyn Clock>,
}

impl BookingManager {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = SeatLedger::new(assignments.clone());
        Self { trips, assignments, bookings, ledger, clock }
    }

    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    pub async fn book(
        &self,
        rider_id: Uuid,
        trip_id: Uuid,
        driver_assignment_id: Uuid,
    ) -> Result<Booking, BookingError> {
        // 1. Trip must exist and be open
        match self.trips.get_trip(trip_id).await? {
            Some(trip) if trip.is_open() => {}
            _ => return Err(BookingError::TripUnavailable),
        }

        // 2. One live booking per rider per trip
        if self.bookings.find_active_booking(trip_id, rider_id).await?.is_some() {
            return Err(BookingError::AlreadyBooked);
        }

        // The seat pool has to belong to this trip
        match self.assignments.get_assignment(driver_assignment_id).await? {
            Some(a) if a.trip_id == trip_id => {}
            _ => return Err(BookingError::AssignmentNotFound),
        }

        // 3. Take the seat
        self.ledger.reserve(driver_assignment_id).await?;

        // 4. Record the booking, giving the seat back if that fails
        let booking = Booking::confirmed(trip_id, rider_id, driver_assignment_id, self.clock.now());
        let outcome = match self.bookings.insert_booking(&booking).await {
            Ok(BookingInsert::Created) => {
                info!(booking_id = %booking.id, %trip_id, %rider_id, "Booking confirmed");
                return Ok(booking);
            }
            Ok(BookingInsert::Duplicate) => Err(BookingError::AlreadyBooked),
            Err(e) => Err(BookingError::from(e)),
        };

        self.compensate(driver_assignment_id).await;
        outcome
    }

    pub async fn cancel(&self, rider_id: Uuid, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.rider_id != rider_id {
            warn!(%booking_id, %rider_id, "Cancel attempted by non-owner");
            return Err(BookingError::Forbidden);
        }

        if booking.is_cancelled() {
            return Err(BookingError::AlreadyCancelled);
        }

        // The status flip is conditional, so of two racing cancels only one releases a seat.
        let cancelled = match self.bookings.cancel_booking(booking_id, self.clock.now()).await? {
            CancelOutcome::Cancelled(b) => b,
            CancelOutcome::AlreadyCancelled => return Err(BookingError::AlreadyCancelled),
            CancelOutcome::Missing => return Err(BookingError::NotFound),
        };

        match self.ledger.release(cancelled.driver_assignment_id).await {
            Ok(_) => {}
            Err(InventoryError::NotFound(id)) => {
                warn!(%booking_id, driver_assignment_id = %id, "Assignment gone; no seat to restore");
            }
            Err(e) => {
                // Put the booking back so the caller can retry the whole cancellation.
                match self.bookings.reinstate_booking(booking_id, self.clock.now()).await {
                    Ok(Some(_)) => warn!(%booking_id, "Seat release failed; cancellation rolled back: {}", e),
                    Ok(None) => error!(%booking_id, "Seat release failed and booking could not be reinstated: {}", e),
                    Err(undo) => error!(%booking_id, "Seat release failed ({}); reinstating booking failed: {}", e, undo),
                }
                return Err(e.into());
            }
        }

        info!(%booking_id, %rider_id, "Booking cancelled");
        Ok(cancelled)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        Ok(self.bookings.get_booking(booking_id).await?)
    }

    async fn compensate(&self, driver_assignment_id: Uuid) {
        if let Err(e) = self.ledger.release(driver_assignment_id).await {
            error!(%driver_assignment_id, "Failed to restore seat after booking insert failed: {}", e);
        }
    }
}
