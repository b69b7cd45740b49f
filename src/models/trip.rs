//! Estado del viaje tal como lo ve el conductor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    bus_location::BusLocation,
    route::{Route, RouteStatus},
    stop::{index_of, Stop},
};

/// Estado del viaje de una ruta: parada actual y siguiente
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripState {
    pub route_id: Uuid,
    pub route_name: String,
    pub status: RouteStatus,
    pub driver_id: Option<Uuid>,
    pub current_stop: Option<Stop>,
    pub next_stop: Option<Stop>,
    pub stop_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TripState {
    pub fn from_parts(route: &Route, stops: &[Stop], location: Option<&BusLocation>) -> Self {
        let current_index = location
            .and_then(|location| location.current_stop_id)
            .and_then(|stop_id| index_of(stops, stop_id));

        Self {
            route_id: route.id,
            route_name: route.name.clone(),
            status: route.status,
            driver_id: route.driver_id,
            current_stop: current_index.map(|index| stops[index].clone()),
            next_stop: current_index.and_then(|index| stops.get(index + 1).cloned()),
            stop_count: stops.len(),
            last_updated: location.map(|location| location.last_updated),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RouteStatus::Completed
    }
}
