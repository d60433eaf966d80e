use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Open,
    Closed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Open => "open",
            TripStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TripStatus::Open),
            "closed" => Ok(TripStatus::Closed),
            other => Err(CoreError::InternalError(format!("unknown trip status {other}"))),
        }
    }
}

/// A scheduled group trip. `booked_seats` is informational only and never drives seat
/// accounting; per-driver assignments hold the real counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub total_seats: i32,
    pub booked_seats: i32,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(title: &str, date: &str, total_seats: i32, now: DateTime<Utc>) -> CoreResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::ValidationError("title".to_string()));
        }
        if total_seats <= 0 {
            return Err(CoreError::ValidationError("totalSeats".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            date: parse_trip_date(date)?,
            total_seats,
            booked_seats: 0,
            status: TripStatus::Open,
            created_at: now,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == TripStatus::Open
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_trip_date(raw: &str) -> CoreResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CoreError::ValidationError("date".to_string()))
}

/// A driver's seat pool for one trip, grouped by pickup area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub area: String,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
}

impl DriverAssignment {
    pub fn new(
        trip_id: Uuid,
        driver_id: Uuid,
        area: &str,
        available_seats: i32,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let area = area.trim();
        if area.is_empty() {
            return Err(CoreError::ValidationError("area".to_string()));
        }
        if available_seats < 1 {
            return Err(CoreError::ValidationError("availableSeats".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_id,
            area: area.to_string(),
            available_seats,
            created_at: now,
        })
    }
}

/// An assignment joined with its driver's display name, as riders see it when picking a car.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentListing {
    #[serde(flatten)]
    pub assignment: DriverAssignment,
    pub driver_name: String,
    pub driver_last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_dates_accept_rfc3339_and_plain_dates() {
        let d = parse_trip_date("2026-11-14").unwrap();
        assert_eq!(d.to_rfc3339(), "2026-11-14T00:00:00+00:00");

        let d = parse_trip_date("2026-11-14T08:30:00+02:00").unwrap();
        assert_eq!(d.to_rfc3339(), "2026-11-14T06:30:00+00:00");

        assert!(parse_trip_date("next tuesday").is_err());
    }

    #[test]
    fn new_trips_are_open_with_no_booked_seats() {
        let trip = Trip::new("ICC Cape Town", "2026-11-14", 40, Utc::now()).unwrap();
        assert!(trip.is_open());
        assert_eq!(trip.booked_seats, 0);
    }

    #[test]
    fn assignments_need_an_area_and_a_seat() {
        let now = Utc::now();
        let (trip, driver) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(DriverAssignment::new(trip, driver, "  ", 3, now).is_err());
        assert!(DriverAssignment::new(trip, driver, "Bellville", 0, now).is_err());
        let a = DriverAssignment::new(trip, driver, " Bellville ", 3, now).unwrap();
        assert_eq!(a.area, "Bellville");
    }
}
