pub mod booking;
pub mod challenge;
pub mod clock;
pub mod codec;
pub mod identity;
pub mod memory;
pub mod notifier;
pub mod repository;
pub mod trip;

pub use booking::{Booking, BookingStatus};
pub use challenge::{ChallengeState, PendingChallenge};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Actor, Identity, NewIdentity, Role, Vehicle};
pub use notifier::{Delivery, NotifierError, OtpNotifier};
pub use repository::{RepoError, Repositories};
pub use trip::{AssignmentListing, DriverAssignment, Trip, TripStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid or missing field: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
