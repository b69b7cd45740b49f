//! Datos de prueba compartidos por los tests de servicios

use std::sync::Arc;

use crate::models::{Coordinates, NewRoute, NewStop, NewUser, Route, ShiftNumber, Stop, User, UserRole};
use crate::repositories::{MemoryShuttleRepository, ShuttleRepository};

pub fn memory_repo() -> Arc<dyn ShuttleRepository> {
    Arc::new(MemoryShuttleRepository::new())
}

pub async fn seed_route(repo: &Arc<dyn ShuttleRepository>, name: &str, stop_names: &[&str]) -> (Route, Vec<Stop>) {
    let route = repo
        .insert_route(NewRoute {
            name: name.to_string(),
            shift_number: ShiftNumber::try_from(1).unwrap(),
            shift_timing: Some("8:00 AM - 4:00 PM".to_string()),
            start_time: "6:00 AM".to_string(),
            departure_time: "6:20 AM".to_string(),
            vehicle_number: "MH14 GU 4455".to_string(),
            driver_name: None,
            driver_mobile: None,
        })
        .await
        .unwrap();

    let stops = repo
        .insert_stops(
            route.id,
            stop_names
                .iter()
                .enumerate()
                .map(|(index, name)| NewStop {
                    sequence_number: index as i32 + 1,
                    name: name.to_string(),
                    pickup_time: None,
                    // Paradas separadas ~1.1 km hacia el norte
                    coordinates: Some(Coordinates::new(18.60 + index as f64 * 0.01, 73.78)),
                })
                .collect(),
        )
        .await
        .unwrap();

    (route, stops)
}

pub async fn create_user(repo: &Arc<dyn ShuttleRepository>, email: &str, role: UserRole) -> User {
    repo.insert_user(NewUser {
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role,
        name: email.split('@').next().unwrap_or(email).to_string(),
        driver_number: matches!(role, UserRole::Driver).then(|| "D-01".to_string()),
    })
    .await
    .unwrap()
}

pub const KALEWADI_STOPS: [&str; 10] = [
    "Kalewadi Phata",
    "Rahatani Phata",
    "Kalewadi D-Mart",
    "Pimpri (Location)",
    "Chinchwad Gaon",
    "Waklekar Wadi",
    "Ravet Bridge",
    "Punawale",
    "JSPM Chowk",
    "SBUP",
];
