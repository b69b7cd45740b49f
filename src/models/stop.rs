//! Modelo de Stop
//!
//! Paradas de una ruta en orden de secuencia. Se siembran una vez y no se
//! modifican después.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::coordinates::Coordinates;

/// Stop - mapea exactamente a la tabla stops
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Stop {
    pub id: Uuid,
    pub route_id: Uuid,
    pub sequence_number: i32,
    pub name: String,
    pub pickup_time: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Stop {
    /// Sin coordenadas la parada no puede dispararse por proximidad
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Datos para sembrar una parada
#[derive(Debug, Clone, Deserialize)]
pub struct NewStop {
    pub sequence_number: i32,
    pub name: String,
    pub pickup_time: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Posición de una parada dentro de la secuencia ordenada
pub fn index_of(stops: &[Stop], stop_id: Uuid) -> Option<usize> {
    stops.iter().position(|stop| stop.id == stop_id)
}
