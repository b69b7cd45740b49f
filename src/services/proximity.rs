//! Proximidad a paradas (haversine)

use geo::HaversineDistance;

use crate::models::{Coordinates, Stop};

/// Radio dentro del cual la siguiente parada se da por alcanzada
pub const AUTO_ADVANCE_RADIUS_METERS: f64 = 100.0;

/// Distancia de gran círculo en metros
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    a.to_point().haversine_distance(&b.to_point())
}

/// Distancia a la parada; `None` si la parada no tiene coordenadas
pub fn distance_to_stop(position: Coordinates, stop: &Stop) -> Option<f64> {
    stop.coordinates().map(|target| distance_meters(position, target))
}

/// Las paradas sin coordenadas solo avanzan a mano
pub fn should_auto_advance(position: Coordinates, next_stop: &Stop) -> bool {
    distance_to_stop(position, next_stop).map_or(false, |meters| meters <= AUTO_ADVANCE_RADIUS_METERS)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn stop_at(coordinates: Option<Coordinates>) -> Stop {
        Stop {
            id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            sequence_number: 2,
            name: "Rahatani Phata".to_string(),
            pickup_time: Some("9:03 AM".to_string()),
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_one_millidegree_of_latitude() {
        // ~111 m por milésima de grado de latitud
        let d = distance_meters(Coordinates::new(18.600, 73.78), Coordinates::new(18.601, 73.78));
        assert_abs_diff_eq!(d, 111.2, epsilon = 0.5);
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = Coordinates::new(18.6298, 73.7997);
        assert_abs_diff_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_auto_advance_threshold() {
        let stop = stop_at(Some(Coordinates::new(18.6000, 73.7800)));

        // ~89 m al sur
        assert!(should_auto_advance(Coordinates::new(18.5992, 73.7800), &stop));
        // ~111 m al sur
        assert!(!should_auto_advance(Coordinates::new(18.5990, 73.7800), &stop));
    }

    #[test]
    fn test_stop_without_coordinates_never_triggers() {
        let stop = stop_at(None);
        assert!(distance_to_stop(Coordinates::new(18.6, 73.78), &stop).is_none());
        assert!(!should_auto_advance(Coordinates::new(18.6, 73.78), &stop));
    }
}
