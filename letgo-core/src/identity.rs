use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

static E164: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+[1-9]\d{6,14}$").expect("E.164 pattern is a valid regex")
});

/// Trims and validates an E.164 phone number (`+27821234567`).
pub fn normalize_phone(raw: &str) -> CoreResult<String> {
    let phone = raw.trim();
    if E164.is_match(phone) {
        Ok(phone.to_string())
    } else {
        Err(CoreError::ValidationError("phoneNumber".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Driver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "member" => Ok(Role::Member),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            _ => Err(CoreError::ValidationError("role".to_string())),
        }
    }
}

/// Car details a driver supplies at registration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    #[serde(rename = "carModel", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "carColor", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "carPlate", skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(rename = "carType", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "carYear", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Vehicle {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.color.is_none()
            && self.plate.is_none()
            && self.kind.is_none()
            && self.year.is_none()
    }
}

/// A registered user. The phone number is the unique login key and the role never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Role,
    #[serde(flatten)]
    pub vehicle: Option<Vehicle>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Validated registration input, not yet persisted.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Role,
    pub vehicle: Option<Vehicle>,
}

impl NewIdentity {
    /// Self-service registration. Only `member` and `driver` may sign themselves up;
    /// a missing role means `member`. Vehicle details are kept for drivers only.
    pub fn registration(
        name: Option<&str>,
        last_name: Option<&str>,
        phone_number: Option<&str>,
        role: Option<&str>,
        vehicle: Vehicle,
    ) -> CoreResult<Self> {
        let name = required(name, "name")?;
        let last_name = required(last_name, "lastName")?;
        let phone_number = normalize_phone(phone_number.unwrap_or_default())?;

        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => Role::from_str(r)?,
            None => Role::Member,
        };
        if role == Role::Admin {
            return Err(CoreError::ValidationError("role".to_string()));
        }

        let vehicle = (role == Role::Driver && !vehicle.is_empty()).then_some(vehicle);

        Ok(Self { name, last_name, phone_number, role, vehicle })
    }

    /// Operator-created administrator (see the `bootstrap-admin` binary).
    pub fn administrator(name: &str, last_name: &str, phone_number: &str) -> CoreResult<Self> {
        Ok(Self {
            name: required(Some(name), "name")?,
            last_name: required(Some(last_name), "lastName")?,
            phone_number: normalize_phone(phone_number)?,
            role: Role::Admin,
            vehicle: None,
        })
    }

    pub fn into_identity(self, now: DateTime<Utc>) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: self.name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            role: self.role,
            vehicle: self.vehicle,
            phone_verified_at: None,
            created_at: now,
        }
    }
}

fn required(value: Option<&str>, field: &str) -> CoreResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::ValidationError(field.to_string())),
    }
}

/// The authenticated caller, as carried by a verified session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers_must_be_e164() {
        assert_eq!(normalize_phone(" +27821234567 ").unwrap(), "+27821234567");
        assert!(normalize_phone("0821234567").is_err());
        assert!(normalize_phone("+0821234567").is_err());
        assert!(normalize_phone("+12345").is_err());
        assert!(normalize_phone("+1234567890123456").is_err());
    }

    #[test]
    fn registration_defaults_to_member_and_drops_vehicle() {
        let vehicle = Vehicle { model: Some("Corolla".into()), ..Vehicle::default() };
        let new = NewIdentity::registration(
            Some("Thandi"),
            Some("Mokoena"),
            Some("+27821234567"),
            None,
            vehicle,
        )
        .unwrap();

        assert_eq!(new.role, Role::Member);
        assert!(new.vehicle.is_none());
    }

    #[test]
    fn drivers_keep_their_vehicle() {
        let vehicle = Vehicle { plate: Some("CA 123-456".into()), ..Vehicle::default() };
        let new = NewIdentity::registration(
            Some("Sipho"),
            Some("Dlamini"),
            Some("+27831234567"),
            Some("driver"),
            vehicle.clone(),
        )
        .unwrap();

        assert_eq!(new.role, Role::Driver);
        assert_eq!(new.vehicle, Some(vehicle));
    }

    #[test]
    fn admin_cannot_self_register() {
        let result = NewIdentity::registration(
            Some("Eve"),
            Some("Mallory"),
            Some("+27841234567"),
            Some("admin"),
            Vehicle::default(),
        );
        assert!(matches!(result, Err(CoreError::ValidationError(f)) if f == "role"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let result = NewIdentity::registration(
            Some("  "),
            Some("Dlamini"),
            Some("+27831234567"),
            None,
            Vehicle::default(),
        );
        assert!(matches!(result, Err(CoreError::ValidationError(f)) if f == "name"));
    }

    #[test]
    fn identity_serializes_camel_case_with_flattened_vehicle() {
        let identity = NewIdentity::registration(
            Some("Sipho"),
            Some("Dlamini"),
            Some("+27831234567"),
            Some("driver"),
            Vehicle { model: Some("Quantum".into()), ..Vehicle::default() },
        )
        .unwrap()
        .into_identity(Utc::now());

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["lastName"], "Dlamini");
        assert_eq!(json["phoneNumber"], "+27831234567");
        assert_eq!(json["role"], "driver");
        assert_eq!(json["carModel"], "Quantum");
        assert!(json.get("carPlate").is_none());
    }
}
