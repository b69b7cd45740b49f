use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::coordinates::Coordinates;

/// Última posición conocida del bus de una ruta (una fila por ruta, se sobrescribe)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BusLocation {
    pub route_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub current_stop_id: Option<Uuid>,
    /// Hora del servidor de la última escritura
    pub last_updated: DateTime<Utc>,
    /// Reloj del dispositivo del último reporte aplicado; solo sirve para ordenar
    /// reportes entre sí. `None` al iniciar el viaje.
    pub reported_at: Option<DateTime<Utc>>,
}

impl BusLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
