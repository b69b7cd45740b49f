use serde::{Deserialize, Serialize};

use crate::models::{Route, Stop};

// Query de listado: ?shift=N
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteListQuery {
    pub shift: Option<i16>,
}

// Ruta con sus paradas ordenadas
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteDetailResponse {
    pub route: Route,
    pub stops: Vec<Stop>,
}

// Resultado de sembrar datos
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SeedReport {
    pub seeded: bool,
    pub routes: usize,
    pub stops: usize,
}
