use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::Booking;
use crate::challenge::{ChallengeState, PendingChallenge};
use crate::identity::Identity;
use crate::trip::{AssignmentListing, DriverAssignment, Trip, TripStatus};

/// Infrastructure failure from a storage backend. Outcomes callers branch on are
/// returned as typed values inside `Ok`, never through this.
pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityInsert {
    Created,
    DuplicatePhone,
}

/// Result of an atomic, storage-side change to an assignment's seat counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatUpdate {
    Applied { available_seats: i32 },
    /// The decrement predicate (`available_seats > 0`) did not hold.
    Exhausted,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingInsert {
    Created,
    /// Another confirmed booking for the same (trip, rider) already exists.
    Duplicate,
}

#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Cancelled(Booking),
    AlreadyCancelled,
    Missing,
}

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn create_identity(&self, identity: &Identity) -> Result<IdentityInsert, RepoError>;

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, RepoError>;

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, RepoError>;

    /// Sets the verification timestamp only if it has never been set.
    async fn mark_phone_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError>;
}

/// Storage for the single challenge slot each identity owns.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    async fn load_challenge(&self, identity_id: Uuid) -> Result<ChallengeState, RepoError>;

    /// Replaces whatever challenge the identity had.
    async fn store_challenge(
        &self,
        identity_id: Uuid,
        challenge: &PendingChallenge,
    ) -> Result<(), RepoError>;

    /// `attempts = attempts + 1`, evaluated by the store.
    async fn record_failed_attempt(&self, identity_id: Uuid) -> Result<(), RepoError>;

    async fn clear_challenge(&self, identity_id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create_trip(&self, trip: &Trip) -> Result<(), RepoError>;

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, RepoError>;

    /// All trips, earliest date first.
    async fn list_trips(&self) -> Result<Vec<Trip>, RepoError>;

    async fn set_trip_status(&self, id: Uuid, status: TripStatus) -> Result<Option<Trip>, RepoError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create_assignment(&self, assignment: &DriverAssignment) -> Result<(), RepoError>;

    async fn get_assignment(&self, id: Uuid) -> Result<Option<DriverAssignment>, RepoError>;

    /// Assignments for `trip_id` in `area` that still have at least one seat.
    async fn list_available(
        &self,
        trip_id: Uuid,
        area: &str,
    ) -> Result<Vec<AssignmentListing>, RepoError>;

    /// Conditional decrement: succeeds only while `available_seats > 0`.
    async fn decrement_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError>;

    async fn increment_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_active_booking(
        &self,
        trip_id: Uuid,
        rider_id: Uuid,
    ) -> Result<Option<Booking>, RepoError>;

    async fn insert_booking(&self, booking: &Booking) -> Result<BookingInsert, RepoError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    /// Confirmed → cancelled as one conditional update.
    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<CancelOutcome, RepoError>;

    /// Cancelled → confirmed, undoing a cancellation whose seat could not be restored.
    /// `None` if the booking is missing or not cancelled.
    async fn reinstate_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>, RepoError>;
}

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub identities: Arc<dyn IdentityRepository>,
    pub challenges: Arc<dyn ChallengeRepository>,
    pub trips: Arc<dyn TripRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}
