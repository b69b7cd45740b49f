//! Máquina de estados del viaje
//!
//! Funciones puras que deciden si una transición es válida a partir del
//! estado leído. La escritura posterior es condicional en el repositorio,
//! así que una decisión tomada sobre una lectura vieja nunca pisa a otro
//! conductor.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{index_of, BusLocation, Route, RouteStatus, Stop, User, UserRole};
use crate::utils::errors::{validation_error, AppError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TripError {
    #[error("Route with id '{0}' not found")]
    RouteNotFound(Uuid),

    #[error("only drivers can operate trips")]
    NotADriver,

    #[error("route '{0}' has no stops")]
    NoStops(Uuid),

    #[error("route '{route_id}' is already active under another driver")]
    HeldByAnotherDriver { route_id: Uuid, driver_id: Option<Uuid> },

    #[error("driver already has route '{active_route_id}' in progress")]
    DriverBusyElsewhere { active_route_id: Uuid },

    #[error("route '{route_id}' is {status}, not active")]
    NotActive { route_id: Uuid, status: RouteStatus },

    #[error("route '{0}' is not being driven by this driver")]
    NotYourTrip(Uuid),

    #[error("route '{0}' has no current stop")]
    NoCurrentStop(Uuid),

    #[error("route '{0}' has no next stop")]
    NoNextStop(Uuid),
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::RouteNotFound(_) => AppError::NotFound(err.to_string()),
            TripError::NotADriver | TripError::NotYourTrip(_) => AppError::Forbidden(err.to_string()),
            TripError::NoStops(_) => validation_error("route_id", "route has no stops"),
            TripError::HeldByAnotherDriver { .. } | TripError::DriverBusyElsewhere { .. } => {
                AppError::Conflict(err.to_string())
            }
            TripError::NotActive { .. } | TripError::NoCurrentStop(_) | TripError::NoNextStop(_) => {
                AppError::InvalidTransition(err.to_string())
            }
        }
    }
}

/// `start` válido: la posición siempre arranca en la primera parada
#[derive(Debug, Clone, PartialEq)]
pub struct StartPlan {
    pub first_stop_id: Uuid,
    /// El mismo conductor vuelve a entrar a su viaje activo
    pub reentry: bool,
}

/// Qué hacer ante un `advanceStop`
#[derive(Debug, Clone, PartialEq)]
pub enum AdvancePlan {
    Advance {
        from_stop_id: Uuid,
        to_stop_id: Uuid,
        completes_trip: bool,
    },
    /// La parada esperada ya quedó atrás (auto-avance y avance manual a la vez)
    AlreadyAdvanced,
}

fn ensure_driver(driver: &User) -> Result<(), TripError> {
    match driver.role {
        UserRole::Driver => Ok(()),
        _ => Err(TripError::NotADriver),
    }
}

fn ensure_owned(route: &Route, driver_id: Uuid) -> Result<(), TripError> {
    if route.status != RouteStatus::Active {
        return Err(TripError::NotActive {
            route_id: route.id,
            status: route.status,
        });
    }
    if route.driver_id != Some(driver_id) {
        return Err(TripError::NotYourTrip(route.id));
    }
    Ok(())
}

pub fn plan_start(route: &Route, stops: &[Stop], driver: &User) -> Result<StartPlan, TripError> {
    ensure_driver(driver)?;

    let first_stop = stops.first().ok_or(TripError::NoStops(route.id))?;

    if let Some(active_route_id) = driver.active_route_id {
        if active_route_id != route.id {
            return Err(TripError::DriverBusyElsewhere { active_route_id });
        }
    }

    match route.status {
        RouteStatus::Active if route.driver_id != Some(driver.id) => Err(TripError::HeldByAnotherDriver {
            route_id: route.id,
            driver_id: route.driver_id,
        }),
        status => {
            debug_assert!(status.can_transition_to(RouteStatus::Active));
            Ok(StartPlan {
                first_stop_id: first_stop.id,
                reentry: status == RouteStatus::Active,
            })
        }
    }
}

pub fn plan_position(route: &Route, driver_id: Uuid) -> Result<(), TripError> {
    ensure_owned(route, driver_id)
}

/// `expected_current_stop_id` hace el avance idempotente: si la parada actual
/// ya no es la esperada, no se avanza otra vez.
pub fn plan_advance(
    route: &Route,
    stops: &[Stop],
    location: Option<&BusLocation>,
    driver_id: Uuid,
    expected_current_stop_id: Option<Uuid>,
) -> Result<AdvancePlan, TripError> {
    ensure_owned(route, driver_id)?;

    let current_stop_id = location
        .and_then(|location| location.current_stop_id)
        .ok_or(TripError::NoCurrentStop(route.id))?;

    if let Some(expected) = expected_current_stop_id {
        if expected != current_stop_id {
            return Ok(AdvancePlan::AlreadyAdvanced);
        }
    }

    let current_index = index_of(stops, current_stop_id).ok_or(TripError::NoCurrentStop(route.id))?;
    let next_stop = stops.get(current_index + 1).ok_or(TripError::NoNextStop(route.id))?;

    Ok(AdvancePlan::Advance {
        from_stop_id: current_stop_id,
        to_stop_id: next_stop.id,
        completes_trip: current_index + 2 == stops.len(),
    })
}

pub fn plan_complete(route: &Route, driver_id: Uuid) -> Result<(), TripError> {
    ensure_owned(route, driver_id)?;
    debug_assert!(route.status.can_transition_to(RouteStatus::Completed));
    Ok(())
}
