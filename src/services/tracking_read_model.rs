//! Read model de seguimiento
//!
//! Función pura sobre una foto inmutable: sin estado oculto. Se recalcula en
//! cada aviso del feed de cambios.

use crate::models::{index_of, StopDisplayClass, StopView, TrackingSnapshot, TrackingView};

pub fn derive_tracking_view(snapshot: &TrackingSnapshot) -> TrackingView {
    let TrackingSnapshot {
        route,
        stops,
        location,
        latest_counts,
    } = snapshot;

    let current_index = location
        .as_ref()
        .and_then(|location| location.current_stop_id)
        .and_then(|stop_id| index_of(stops, stop_id));

    let stop_views: Vec<StopView> = stops
        .iter()
        .enumerate()
        .map(|(index, stop)| StopView {
            id: stop.id,
            sequence_number: stop.sequence_number,
            name: stop.name.clone(),
            pickup_time: stop.pickup_time.clone(),
            coordinates: stop.coordinates(),
            display_class: display_class(index, current_index),
            // Sin reporte se muestra 0
            student_count: latest_counts.get(&stop.id).copied().unwrap_or(0),
        })
        .collect();

    TrackingView {
        route_id: route.id,
        route_name: route.name.clone(),
        shift_number: route.shift_number,
        vehicle_number: route.vehicle_number.clone(),
        driver_name: route.driver_name.clone(),
        driver_mobile: route.driver_mobile.clone(),
        status: route.status,
        progress_percent: progress_percent(current_index, stops.len()),
        current_stop: current_index.map(|index| stop_views[index].clone()),
        next_stop: current_index.and_then(|index| stop_views.get(index + 1).cloned()),
        first_stop_name: stops.first().map(|stop| stop.name.clone()),
        last_stop_name: stops.last().map(|stop| stop.name.clone()),
        bus_position: location.as_ref().map(|location| location.coordinates()),
        last_updated: location.as_ref().map(|location| location.last_updated),
        stops: stop_views,
    }
}

pub fn progress_percent(current_index: Option<usize>, stop_count: usize) -> f64 {
    match current_index {
        Some(index) if stop_count > 0 => (index + 1) as f64 * 100.0 / stop_count as f64,
        _ => 0.0,
    }
}

fn display_class(index: usize, current_index: Option<usize>) -> StopDisplayClass {
    match current_index {
        Some(current) if index < current => StopDisplayClass::Completed,
        Some(current) if index == current => StopDisplayClass::Current,
        _ => StopDisplayClass::Upcoming,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::{BusLocation, Route, RouteStatus, ShiftNumber, Stop};

    fn snapshot(stop_count: i32, current: Option<usize>) -> TrackingSnapshot {
        let route_id = Uuid::new_v4();
        let stops: Vec<Stop> = (1..=stop_count)
            .map(|sequence_number| Stop {
                id: Uuid::new_v4(),
                route_id,
                sequence_number,
                name: format!("Stop {}", sequence_number),
                pickup_time: Some("7:00 AM".to_string()),
                latitude: Some(18.6),
                longitude: Some(73.8),
                created_at: Utc::now(),
            })
            .collect();

        let location = current.map(|index| BusLocation {
            route_id,
            latitude: 18.61,
            longitude: 73.79,
            current_stop_id: Some(stops[index].id),
            last_updated: Utc::now(),
            reported_at: None,
        });

        TrackingSnapshot {
            route: Route {
                id: route_id,
                name: "KALEWADI".to_string(),
                shift_number: ShiftNumber::try_from(2).unwrap(),
                shift_timing: None,
                start_time: "6:00 AM".to_string(),
                departure_time: "6:15 AM".to_string(),
                vehicle_number: "MH14 GU 4455".to_string(),
                driver_id: None,
                driver_name: Some("Suresh".to_string()),
                driver_mobile: None,
                status: if current.is_some() { RouteStatus::Active } else { RouteStatus::Inactive },
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            stops,
            location,
            latest_counts: HashMap::new(),
        }
    }

    #[test]
    fn test_no_current_stop_means_zero_progress() {
        let view = derive_tracking_view(&snapshot(4, None));
        assert_eq!(view.progress_percent, 0.0);
        assert!(view.current_stop.is_none());
        assert!(view.next_stop.is_none());
        assert!(view.stops.iter().all(|stop| stop.display_class == StopDisplayClass::Upcoming));
    }

    #[test]
    fn test_display_classes_around_current_stop() {
        let view = derive_tracking_view(&snapshot(4, Some(1)));
        let classes: Vec<_> = view.stops.iter().map(|stop| stop.display_class).collect();
        assert_eq!(
            classes,
            vec![
                StopDisplayClass::Completed,
                StopDisplayClass::Current,
                StopDisplayClass::Upcoming,
                StopDisplayClass::Upcoming,
            ]
        );
        assert_relative_eq!(view.progress_percent, 50.0);
        assert_eq!(view.next_stop.unwrap().sequence_number, 3);
    }

    #[test]
    fn test_last_stop_is_full_progress() {
        let view = derive_tracking_view(&snapshot(10, Some(9)));
        assert_relative_eq!(view.progress_percent, 100.0);
        assert!(view.next_stop.is_none());
        assert_eq!(view.last_stop_name.as_deref(), Some("Stop 10"));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut previous = 0.0;
        for index in 0..7 {
            let current = progress_percent(Some(index), 7);
            assert!(current >= previous);
            previous = current;
        }
        assert_relative_eq!(previous, 100.0);
    }

    #[test]
    fn test_counts_default_to_zero() {
        let mut snap = snapshot(3, Some(0));
        snap.latest_counts.insert(snap.stops[2].id, 12);

        let view = derive_tracking_view(&snap);
        assert_eq!(view.stops[0].student_count, 0);
        assert_eq!(view.stops[2].student_count, 12);
    }

    #[test]
    fn test_empty_route_has_no_progress() {
        assert_eq!(progress_percent(Some(0), 0), 0.0);
    }
}
