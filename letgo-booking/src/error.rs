use letgo_core::{CoreError, RepoError};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Driver assignment not found: {0}")]
    NotFound(Uuid),

    #[error("No seats left on driver assignment {0}")]
    SoldOut(Uuid),

    #[error("Inventory storage error: {0}")]
    Internal(String),
}

impl From<RepoError> for InventoryError {
    fn from(err: RepoError) -> Self {
        InventoryError::Internal(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Trip not available")]
    TripUnavailable,

    #[error("Driver not available")]
    AssignmentNotFound,

    #[error("Driver has no seats left")]
    SoldOut,

    #[error("Already booked")]
    AlreadyBooked,

    #[error("Booking not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Booking already cancelled")]
    AlreadyCancelled,

    #[error("Booking storage error: {0}")]
    Internal(String),
}

impl From<RepoError> for BookingError {
    fn from(err: RepoError) -> Self {
        BookingError::Internal(err.to_string())
    }
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(_) => BookingError::AssignmentNotFound,
            InventoryError::SoldOut(_) => BookingError::SoldOut,
            InventoryError::Internal(msg) => BookingError::Internal(msg),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Trip not found")]
    NotFound,

    #[error("Trip not available")]
    TripUnavailable,

    #[error("Only {0} accounts may do this")]
    Forbidden(&'static str),

    #[error("Invalid or missing field: {0}")]
    Validation(String),

    #[error("Trip storage error: {0}")]
    Internal(String),
}

impl From<RepoError> for TripError {
    fn from(err: RepoError) -> Self {
        TripError::Internal(err.to_string())
    }
}

impl From<CoreError> for TripError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(field) => TripError::Validation(field),
            CoreError::InternalError(msg) => TripError::Internal(msg),
        }
    }
}
