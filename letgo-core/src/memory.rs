//! In-process implementations of every repository trait.
//!
//! Each operation runs under one lock, so conditional updates are linearizable the same
//! way the Postgres statements are. Used by tests and for running without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::challenge::{ChallengeState, PendingChallenge};
use crate::identity::Identity;
use crate::repository::*;
use crate::trip::{AssignmentListing, DriverAssignment, Trip, TripStatus};

#[derive(Default)]
struct Tables {
    identities: HashMap<Uuid, Identity>,
    phone_index: HashMap<String, Uuid>,
    challenges: HashMap<Uuid, PendingChallenge>,
    trips: HashMap<Uuid, Trip>,
    assignments: HashMap<Uuid, DriverAssignment>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out this store behind every repository trait.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            identities: Arc::new(self.clone()),
            challenges: Arc::new(self.clone()),
            trips: Arc::new(self.clone()),
            assignments: Arc::new(self.clone()),
            bookings: Arc::new(self.clone()),
        }
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create_identity(&self, identity: &Identity) -> Result<IdentityInsert, RepoError> {
        let mut t = self.tables.lock().await;
        if t.phone_index.contains_key(&identity.phone_number) {
            return Ok(IdentityInsert::DuplicatePhone);
        }
        t.phone_index.insert(identity.phone_number.clone(), identity.id);
        t.identities.insert(identity.id, identity.clone());
        Ok(IdentityInsert::Created)
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, RepoError> {
        let t = self.tables.lock().await;
        Ok(t.phone_index
            .get(phone_number)
            .and_then(|id| t.identities.get(id))
            .cloned())
    }

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, RepoError> {
        Ok(self.tables.lock().await.identities.get(&id).cloned())
    }

    async fn mark_phone_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(identity) = self.tables.lock().await.identities.get_mut(&id) {
            identity.phone_verified_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[async_trait]
impl ChallengeRepository for MemoryStore {
    async fn load_challenge(&self, identity_id: Uuid) -> Result<ChallengeState, RepoError> {
        Ok(match self.tables.lock().await.challenges.get(&identity_id) {
            Some(c) => ChallengeState::Pending(c.clone()),
            None => ChallengeState::None,
        })
    }

    async fn store_challenge(
        &self,
        identity_id: Uuid,
        challenge: &PendingChallenge,
    ) -> Result<(), RepoError> {
        self.tables.lock().await.challenges.insert(identity_id, challenge.clone());
        Ok(())
    }

    async fn record_failed_attempt(&self, identity_id: Uuid) -> Result<(), RepoError> {
        if let Some(c) = self.tables.lock().await.challenges.get_mut(&identity_id) {
            c.attempts = c.attempts.saturating_add(1);
        }
        Ok(())
    }

    async fn clear_challenge(&self, identity_id: Uuid) -> Result<(), RepoError> {
        self.tables.lock().await.challenges.remove(&identity_id);
        Ok(())
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn create_trip(&self, trip: &Trip) -> Result<(), RepoError> {
        self.tables.lock().await.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, RepoError> {
        Ok(self.tables.lock().await.trips.get(&id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RepoError> {
        let mut trips: Vec<Trip> = self.tables.lock().await.trips.values().cloned().collect();
        trips.sort_by_key(|t| t.date);
        Ok(trips)
    }

    async fn set_trip_status(&self, id: Uuid, status: TripStatus) -> Result<Option<Trip>, RepoError> {
        let mut t = self.tables.lock().await;
        Ok(t.trips.get_mut(&id).map(|trip| {
            trip.status = status;
            trip.clone()
        }))
    }
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn create_assignment(&self, assignment: &DriverAssignment) -> Result<(), RepoError> {
        self.tables.lock().await.assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<DriverAssignment>, RepoError> {
        Ok(self.tables.lock().await.assignments.get(&id).cloned())
    }

    async fn list_available(
        &self,
        trip_id: Uuid,
        area: &str,
    ) -> Result<Vec<AssignmentListing>, RepoError> {
        let t = self.tables.lock().await;
        let mut listings: Vec<AssignmentListing> = t
            .assignments
            .values()
            .filter(|a| a.trip_id == trip_id && a.area == area && a.available_seats > 0)
            .map(|a| {
                let driver = t.identities.get(&a.driver_id);
                AssignmentListing {
                    assignment: a.clone(),
                    driver_name: driver.map(|d| d.name.clone()).unwrap_or_default(),
                    driver_last_name: driver.map(|d| d.last_name.clone()).unwrap_or_default(),
                }
            })
            .collect();
        listings.sort_by_key(|l| l.assignment.created_at);
        Ok(listings)
    }

    async fn decrement_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError> {
        let mut t = self.tables.lock().await;
        Ok(match t.assignments.get_mut(&id) {
            None => SeatUpdate::Missing,
            Some(a) if a.available_seats <= 0 => SeatUpdate::Exhausted,
            Some(a) => {
                a.available_seats -= 1;
                SeatUpdate::Applied { available_seats: a.available_seats }
            }
        })
    }

    async fn increment_seat(&self, id: Uuid) -> Result<SeatUpdate, RepoError> {
        let mut t = self.tables.lock().await;
        Ok(match t.assignments.get_mut(&id) {
            None => SeatUpdate::Missing,
            Some(a) => {
                a.available_seats += 1;
                SeatUpdate::Applied { available_seats: a.available_seats }
            }
        })
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_active_booking(
        &self,
        trip_id: Uuid,
        rider_id: Uuid,
    ) -> Result<Option<Booking>, RepoError> {
        Ok(self
            .tables
            .lock()
            .await
            .bookings
            .values()
            .find(|b| b.trip_id == trip_id && b.rider_id == rider_id && !b.is_cancelled())
            .cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<BookingInsert, RepoError> {
        let mut t = self.tables.lock().await;
        let duplicate = t.bookings.values().any(|b| {
            b.trip_id == booking.trip_id && b.rider_id == booking.rider_id && !b.is_cancelled()
        });
        if duplicate {
            return Ok(BookingInsert::Duplicate);
        }
        t.bookings.insert(booking.id, booking.clone());
        Ok(BookingInsert::Created)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<CancelOutcome, RepoError> {
        let mut t = self.tables.lock().await;
        Ok(match t.bookings.get_mut(&id) {
            None => CancelOutcome::Missing,
            Some(b) if b.is_cancelled() => CancelOutcome::AlreadyCancelled,
            Some(b) => {
                b.status = BookingStatus::Cancelled;
                b.updated_at = at;
                CancelOutcome::Cancelled(b.clone())
            }
        })
    }

    async fn reinstate_booking(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>, RepoError> {
        let mut t = self.tables.lock().await;
        let Some(target) = t.bookings.get(&id).filter(|b| b.is_cancelled()).cloned() else {
            return Ok(None);
        };
        let taken = t.bookings.values().any(|b| {
            b.trip_id == target.trip_id && b.rider_id == target.rider_id && !b.is_cancelled()
        });
        if taken {
            return Err(format!("rider already holds another booking on trip {}", target.trip_id).into());
        }
        Ok(t.bookings.get_mut(&id).map(|b| {
            b.status = BookingStatus::Confirmed;
            b.updated_at = at;
            b.clone()
        }))
    }
}
