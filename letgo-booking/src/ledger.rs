use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use letgo_core::repository::{AssignmentRepository, SeatUpdate};

use crate::InventoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserved {
    pub driver_assignment_id: Uuid,
    pub available_seats: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub driver_assignment_id: Uuid,
    pub available_seats: i32,
}

/// Seat counters per driver assignment. Both directions are single conditional updates
/// in the store; nothing here reads a count and writes it back.
#[derive(Clone)]
pub struct SeatLedger {
    assignments: Arc<dyn AssignmentRepository>,
}

impl SeatLedger {
    pub fn new(assignments: Arc<dyn AssignmentRepository>) -> Self {
        Self { assignments }
    }

    pub async fn reserve(&self, driver_assignment_id: Uuid) -> Result<Reserved, InventoryError> {
        match self.assignments.decrement_seat(driver_assignment_id).await? {
            SeatUpdate::Applied { available_seats } => {
                debug!(%driver_assignment_id, available_seats, "Seat reserved");
                Ok(Reserved { driver_assignment_id, available_seats })
            }
            SeatUpdate::Exhausted => Err(InventoryError::SoldOut(driver_assignment_id)),
            SeatUpdate::Missing => Err(InventoryError::NotFound(driver_assignment_id)),
        }
    }

    /// Undoes one earlier `reserve`. There is no ceiling tied to the original capacity.
    pub async fn release(&self, driver_assignment_id: Uuid) -> Result<Released, InventoryError> {
        match self.assignments.increment_seat(driver_assignment_id).await? {
            SeatUpdate::Applied { available_seats } => {
                debug!(%driver_assignment_id, available_seats, "Seat released");
                Ok(Released { driver_assignment_id, available_seats })
            }
            SeatUpdate::Exhausted | SeatUpdate::Missing => {
                warn!(%driver_assignment_id, "Release against a missing assignment");
                Err(InventoryError::NotFound(driver_assignment_id))
            }
        }
    }
}
