//! Modelo de Route
//!
//! Este módulo contiene el struct Route (plantilla de viaje + estado mutable
//! del viaje) y sus tipos asociados. Mapea exactamente al schema PostgreSQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::utils::validation::validate_range;

/// Estado de la ruta - mapea al ENUM route_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "route_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Inactive,
    Active,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Inactive => "inactive",
            RouteStatus::Active => "active",
            RouteStatus::Completed => "completed",
        }
    }

    /// Transiciones permitidas: inactive→active, active→active (re-entrada del
    /// mismo conductor), active→completed y completed→active (viaje nuevo).
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Inactive, RouteStatus::Active)
                | (RouteStatus::Active, RouteStatus::Active)
                | (RouteStatus::Active, RouteStatus::Completed)
                | (RouteStatus::Completed, RouteStatus::Active)
        )
    }
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Número de turno (1..=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(try_from = "i16", into = "i16")]
pub struct ShiftNumber(i16);

impl ShiftNumber {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 3;

    pub fn value(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for ShiftNumber {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        validate_range(value, Self::MIN, Self::MAX)
            .map(|_| ShiftNumber(value))
            .map_err(|_| format!("shift number must be between {} and {}, got {}", Self::MIN, Self::MAX, value))
    }
}

impl From<ShiftNumber> for i16 {
    fn from(shift: ShiftNumber) -> Self {
        shift.0
    }
}

/// Route principal - mapea exactamente a la tabla routes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub shift_number: ShiftNumber,
    pub shift_timing: Option<String>,
    pub start_time: String,
    pub departure_time: String,
    pub vehicle_number: String,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_mobile: Option<String>,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// El conductor que tiene el viaje activo de esta ruta
    pub fn active_driver(&self) -> Option<Uuid> {
        match self.status {
            RouteStatus::Active => self.driver_id,
            _ => None,
        }
    }

    pub fn is_active_for(&self, driver_id: Uuid) -> bool {
        self.active_driver() == Some(driver_id)
    }
}

/// Datos para sembrar una ruta nueva
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoute {
    pub name: String,
    pub shift_number: ShiftNumber,
    pub shift_timing: Option<String>,
    pub start_time: String,
    pub departure_time: String,
    #[serde(default)]
    pub vehicle_number: String,
    pub driver_name: Option<String>,
    pub driver_mobile: Option<String>,
}

/// Turno con su horario, para el selector de turnos
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ShiftInfo {
    pub shift_number: ShiftNumber,
    pub shift_timing: Option<String>,
}
