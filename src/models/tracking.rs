//! Modelos del read model de seguimiento (vista del estudiante)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    bus_location::BusLocation,
    coordinates::Coordinates,
    route::{Route, RouteStatus, ShiftNumber},
    stop::Stop,
};

/// Foto inmutable de todo lo que necesita la vista, leída de una sola vez
#[derive(Debug, Clone)]
pub struct TrackingSnapshot {
    pub route: Route,
    pub stops: Vec<Stop>,
    pub location: Option<BusLocation>,
    pub latest_counts: HashMap<Uuid, i32>,
}

/// Clase de visualización de una parada respecto a la parada actual
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopDisplayClass {
    Completed,
    Current,
    Upcoming,
}

/// Parada tal como se muestra al estudiante
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopView {
    pub id: Uuid,
    pub sequence_number: i32,
    pub name: String,
    pub pickup_time: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub display_class: StopDisplayClass,
    pub student_count: i32,
}

/// Vista de seguimiento derivada (progreso, parada actual y siguiente)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingView {
    pub route_id: Uuid,
    pub route_name: String,
    pub shift_number: ShiftNumber,
    pub vehicle_number: String,
    pub driver_name: Option<String>,
    pub driver_mobile: Option<String>,
    pub status: RouteStatus,
    pub progress_percent: f64,
    pub current_stop: Option<StopView>,
    pub next_stop: Option<StopView>,
    pub first_stop_name: Option<String>,
    pub last_stop_name: Option<String>,
    pub bus_position: Option<Coordinates>,
    pub last_updated: Option<DateTime<Utc>>,
    pub stops: Vec<StopView>,
}
