use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use letgo_core::repository::{AssignmentRepository, TripRepository};
use letgo_core::{Actor, AssignmentListing, Clock, DriverAssignment, Role, Trip, TripStatus};

use crate::TripError;

/// Trip scheduling for admins and seat-pool declarations for drivers.
pub struct TripDesk {
    trips: Arc<dyn TripRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    clock: Arc<dyn Clock>,
}

impl TripDesk {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { trips, assignments, clock }
    }

    pub async fn create_trip(
        &self,
        actor: Actor,
        title: &str,
        date: &str,
        total_seats: i32,
    ) -> Result<Trip, TripError> {
        require(actor, Role::Admin)?;
        let trip = Trip::new(title, date, total_seats, self.clock.now())?;
        self.trips.create_trip(&trip).await?;
        info!(trip_id = %trip.id, date = %trip.date, "Trip created");
        Ok(trip)
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, TripError> {
        Ok(self.trips.list_trips().await?)
    }

    pub async fn close_trip(&self, actor: Actor, trip_id: Uuid) -> Result<Trip, TripError> {
        require(actor, Role::Admin)?;
        let trip = self
            .trips
            .set_trip_status(trip_id, TripStatus::Closed)
            .await?
            .ok_or(TripError::NotFound)?;
        info!(%trip_id, "Trip closed");
        Ok(trip)
    }

    pub async fn create_assignment(
        &self,
        actor: Actor,
        trip_id: Uuid,
        area: &str,
        available_seats: i32,
    ) -> Result<DriverAssignment, TripError> {
        require(actor, Role::Driver)?;

        match self.trips.get_trip(trip_id).await? {
            Some(trip) if trip.is_open() => {}
            _ => return Err(TripError::TripUnavailable),
        }

        let assignment = DriverAssignment::new(trip_id, actor.id, area, available_seats, self.clock.now())?;
        self.assignments.create_assignment(&assignment).await?;
        info!(assignment_id = %assignment.id, %trip_id, area = %assignment.area, seats = available_seats, "Driver assignment created");
        Ok(assignment)
    }

    pub async fn list_available(
        &self,
        trip_id: Uuid,
        area: Option<&str>,
    ) -> Result<Vec<AssignmentListing>, TripError> {
        let area = area
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TripError::Validation("area".to_string()))?;
        Ok(self.assignments.list_available(trip_id, area).await?)
    }
}

fn require(actor: Actor, role: Role) -> Result<(), TripError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(TripError::Forbidden(role.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letgo_core::memory::MemoryStore;
    use letgo_core::SystemClock;

    fn desk() -> (TripDesk, MemoryStore) {
        let store = MemoryStore::new();
        let repos = store.repositories();
        (TripDesk::new(repos.trips, repos.assignments, Arc::new(SystemClock)), store)
    }

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::new_v4(), role }
    }

    #[tokio::test]
    async fn only_admins_schedule_and_close_trips() {
        let (desk, _store) = desk();
        let denied = desk.create_trip(actor(Role::Member), "ICC", "2026-11-14", 10).await;
        assert!(matches!(denied, Err(TripError::Forbidden("admin"))));

        let admin = actor(Role::Admin);
        let trip = desk.create_trip(admin, "ICC", "2026-11-14", 10).await.unwrap();
        let closed = desk.close_trip(admin, trip.id).await.unwrap();
        assert_eq!(closed.status, TripStatus::Closed);

        assert!(matches!(desk.close_trip(admin, Uuid::new_v4()).await, Err(TripError::NotFound)));
    }

    #[tokio::test]
    async fn trips_list_in_date_order() {
        let (desk, _store) = desk();
        let admin = actor(Role::Admin);
        desk.create_trip(admin, "Later", "2026-12-01", 10).await.unwrap();
        desk.create_trip(admin, "Sooner", "2026-11-01", 10).await.unwrap();

        let titles: Vec<String> = desk.list_trips().await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);
    }

    #[tokio::test]
    async fn drivers_declare_seats_on_open_trips_only() {
        let (desk, _store) = desk();
        let admin = actor(Role::Admin);
        let driver = actor(Role::Driver);
        let trip = desk.create_trip(admin, "ICC", "2026-11-14", 10).await.unwrap();

        let member = desk.create_assignment(actor(Role::Member), trip.id, "Bellville", 3).await;
        assert!(matches!(member, Err(TripError::Forbidden("driver"))));

        let assignment = desk.create_assignment(driver, trip.id, "Bellville", 3).await.unwrap();
        assert_eq!(assignment.driver_id, driver.id);

        desk.close_trip(admin, trip.id).await.unwrap();
        let closed = desk.create_assignment(driver, trip.id, "Bellville", 3).await;
        assert!(matches!(closed, Err(TripError::TripUnavailable)));
    }

    #[tokio::test]
    async fn listing_filters_by_area_and_free_seats() {
        let (desk, store) = desk();
        let admin = actor(Role::Admin);
        let driver = actor(Role::Driver);
        let trip = desk.create_trip(admin, "ICC", "2026-11-14", 10).await.unwrap();

        let full = desk.create_assignment(driver, trip.id, "Bellville", 1).await.unwrap();
        store.decrement_seat(full.id).await.unwrap();
        let open = desk.create_assignment(driver, trip.id, "Bellville", 2).await.unwrap();
        desk.create_assignment(driver, trip.id, "Durbanville", 2).await.unwrap();

        let listed = desk.list_available(trip.id, Some("Bellville")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].assignment.id, open.id);

        assert!(matches!(desk.list_available(trip.id, None).await, Err(TripError::Validation(_))));
        assert!(matches!(desk.list_available(trip.id, Some(" ")).await, Err(TripError::Validation(_))));
    }
}
