//! Contrato de persistencia del rastreador
//!
//! Todas las escrituras que tocan el estado del viaje son condicionales
//! (comprueban el conductor y el estado almacenados), de modo que dos
//! escritores concurrentes se resuelven por "gana el primero que confirma".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    BusLocation, Coordinates, NewRoute, NewStop, NewUser, Route, ShiftInfo, ShiftNumber, Stop,
    StudentCount, TrackingSnapshot, User,
};
use crate::utils::errors::AppResult;

/// Escritura atómica que inicia un viaje
#[derive(Debug, Clone)]
pub struct BeginTrip {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_mobile: Option<String>,
    pub position: Coordinates,
    pub first_stop_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Resultado de reclamar una ruta para un conductor
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Route),
    HeldBy(Route),
    RouteNotFound,
}

/// Reporte de posición del conductor
///
/// `reported_at` es el reloj del dispositivo y solo se compara con reportes
/// anteriores del mismo viaje; `received_at` es la hora del servidor.
#[derive(Debug, Clone)]
pub struct PositionReport {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub position: Coordinates,
    pub reported_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
}

/// Compare-and-set de la parada actual
#[derive(Debug, Clone)]
pub struct StopAdvance {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub from_stop_id: Uuid,
    pub to_stop_id: Uuid,
    pub completes_trip: bool,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait ShuttleRepository: Send + Sync {
    // Catálogo de rutas y paradas
    async fn count_routes(&self) -> AppResult<i64>;
    async fn insert_route(&self, route: NewRoute) -> AppResult<Route>;
    async fn insert_stops(&self, route_id: Uuid, stops: Vec<NewStop>) -> AppResult<Vec<Stop>>;
    async fn list_routes(&self, shift: Option<ShiftNumber>) -> AppResult<Vec<Route>>;
    async fn list_shifts(&self) -> AppResult<Vec<ShiftInfo>>;
    async fn find_route(&self, route_id: Uuid) -> AppResult<Option<Route>>;
    /// Paradas ordenadas por número de secuencia
    async fn list_stops(&self, route_id: Uuid) -> AppResult<Vec<Stop>>;
    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<Stop>>;

    // Estado del viaje
    async fn find_bus_location(&self, route_id: Uuid) -> AppResult<Option<BusLocation>>;
    /// Reclama la ruta, fija la ruta activa del conductor e inicializa la posición
    async fn begin_trip(&self, trip: BeginTrip) -> AppResult<ClaimOutcome>;
    /// `false` si el reporte es más viejo que el último aplicado o el viaje ya no es del conductor
    async fn record_position(&self, report: PositionReport) -> AppResult<bool>;
    /// `false` si la parada actual ya no es `from_stop_id`
    async fn advance_stop(&self, advance: StopAdvance) -> AppResult<bool>;
    /// Completa el viaje y limpia la ruta activa del conductor; `None` si no estaba activo para él
    async fn finish_trip(&self, route_id: Uuid, driver_id: Uuid) -> AppResult<Option<Route>>;

    // Conteo de estudiantes
    async fn insert_student_count(&self, stop_id: Uuid, count: i32) -> AppResult<StudentCount>;
    async fn latest_student_count(&self, stop_id: Uuid) -> AppResult<Option<StudentCount>>;

    // Read model
    async fn load_tracking_snapshot(&self, route_id: Uuid) -> AppResult<Option<TrackingSnapshot>>;

    // Usuarios
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}
