//! Repositorio en memoria
//!
//! Misma semántica condicional que el repositorio PostgreSQL. Cada operación
//! toma un único lock sobre todas las tablas, así que cada escritura es atómica
//! y cada lectura del read model es una foto consistente.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    BusLocation, NewRoute, NewStop, NewUser, Route, RouteStatus, ShiftInfo, ShiftNumber,
    Stop, StudentCount, TrackingSnapshot, User,
};
use crate::repositories::shuttle_repository::{
    BeginTrip, ClaimOutcome, PositionReport, ShuttleRepository, StopAdvance,
};
use crate::utils::errors::{conflict_error, AppResult};

#[derive(Default)]
struct Tables {
    routes: HashMap<Uuid, Route>,
    stops: HashMap<Uuid, Vec<Stop>>,
    locations: HashMap<Uuid, BusLocation>,
    /// En orden de inserción: el último de cada parada es el vigente
    counts: Vec<StudentCount>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    fn find_stop(&self, stop_id: Uuid) -> Option<&Stop> {
        self.stops.values().flatten().find(|stop| stop.id == stop_id)
    }

    fn clear_active_route(&mut self, driver_id: Uuid, route_id: Uuid) {
        if let Some(user) = self.users.get_mut(&driver_id) {
            if user.active_route_id == Some(route_id) {
                user.active_route_id = None;
            }
        }
    }
}

/// Solo compara relojes del dispositivo; sin marca en alguno de los dos, el reporte entra
fn is_older(incoming: Option<DateTime<Utc>>, stored: Option<DateTime<Utc>>) -> bool {
    matches!((incoming, stored), (Some(incoming), Some(stored)) if incoming < stored)
}

#[derive(Default)]
pub struct MemoryShuttleRepository {
    tables: RwLock<Tables>,
}

impl MemoryShuttleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShuttleRepository for MemoryShuttleRepository {
    async fn count_routes(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.routes.len() as i64)
    }

    async fn insert_route(&self, route: NewRoute) -> AppResult<Route> {
        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            name: route.name,
            shift_number: route.shift_number,
            shift_timing: route.shift_timing,
            start_time: route.start_time,
            departure_time: route.departure_time,
            vehicle_number: route.vehicle_number,
            driver_id: None,
            driver_name: route.driver_name,
            driver_mobile: route.driver_mobile,
            status: RouteStatus::Inactive,
            created_at: now,
            updated_at: now,
        };

        self.tables.write().await.routes.insert(route.id, route.clone());
        Ok(route)
    }

    async fn insert_stops(&self, route_id: Uuid, stops: Vec<NewStop>) -> AppResult<Vec<Stop>> {
        let mut tables = self.tables.write().await;
        let existing = tables.stops.entry(route_id).or_default();

        // Todo o nada, como la transacción de PostgreSQL
        let mut taken: HashSet<i32> = existing.iter().map(|s| s.sequence_number).collect();
        if let Some(duplicate) = stops.iter().find(|stop| !taken.insert(stop.sequence_number)) {
            return Err(conflict_error("Stop", "sequence_number", &duplicate.sequence_number.to_string()));
        }

        let created_at = Utc::now();
        existing.extend(stops.into_iter().map(|stop| Stop {
            id: Uuid::new_v4(),
            route_id,
            sequence_number: stop.sequence_number,
            name: stop.name,
            pickup_time: stop.pickup_time,
            latitude: stop.coordinates.map(|c| c.latitude),
            longitude: stop.coordinates.map(|c| c.longitude),
            created_at,
        }));

        existing.sort_by_key(|stop| stop.sequence_number);
        Ok(existing.clone())
    }

    async fn list_routes(&self, shift: Option<ShiftNumber>) -> AppResult<Vec<Route>> {
        let tables = self.tables.read().await;
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|route| shift.map_or(true, |shift| route.shift_number == shift))
            .cloned()
            .collect();

        routes.sort_by(|a, b| a.name.cmp(&b.name).then(a.shift_number.cmp(&b.shift_number)));
        Ok(routes)
    }

    async fn list_shifts(&self) -> AppResult<Vec<ShiftInfo>> {
        let tables = self.tables.read().await;
        // Mismo criterio que DISTINCT ON ... ORDER BY shift_timing (NULL al final)
        let mut shifts: BTreeMap<ShiftNumber, Option<String>> = BTreeMap::new();

        for route in tables.routes.values() {
            let timing = shifts.entry(route.shift_number).or_insert(None);
            if let Some(candidate) = &route.shift_timing {
                if timing.as_ref().map_or(true, |current| candidate < current) {
                    *timing = Some(candidate.clone());
                }
            }
        }

        Ok(shifts
            .into_iter()
            .map(|(shift_number, shift_timing)| ShiftInfo { shift_number, shift_timing })
            .collect())
    }

    async fn find_route(&self, route_id: Uuid) -> AppResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(&route_id).cloned())
    }

    async fn list_stops(&self, route_id: Uuid) -> AppResult<Vec<Stop>> {
        Ok(self.tables.read().await.stops.get(&route_id).cloned().unwrap_or_default())
    }

    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<Stop>> {
        Ok(self.tables.read().await.find_stop(stop_id).cloned())
    }

    async fn find_bus_location(&self, route_id: Uuid) -> AppResult<Option<BusLocation>> {
        Ok(self.tables.read().await.locations.get(&route_id).cloned())
    }

    async fn begin_trip(&self, trip: BeginTrip) -> AppResult<ClaimOutcome> {
        let mut tables = self.tables.write().await;

        let route = match tables.routes.get_mut(&trip.route_id) {
            Some(route) => route,
            None => return Ok(ClaimOutcome::RouteNotFound),
        };

        if route.status == RouteStatus::Active && route.driver_id != Some(trip.driver_id) {
            return Ok(ClaimOutcome::HeldBy(route.clone()));
        }

        route.driver_id = Some(trip.driver_id);
        route.driver_name = Some(trip.driver_name);
        if trip.driver_mobile.is_some() {
            route.driver_mobile = trip.driver_mobile;
        }
        route.status = RouteStatus::Active;
        route.updated_at = trip.at;
        let claimed = route.clone();

        if let Some(user) = tables.users.get_mut(&trip.driver_id) {
            user.active_route_id = Some(trip.route_id);
        }

        tables.locations.insert(
            trip.route_id,
            BusLocation {
                route_id: trip.route_id,
                latitude: trip.position.latitude,
                longitude: trip.position.longitude,
                current_stop_id: Some(trip.first_stop_id),
                last_updated: trip.at,
                reported_at: None,
            },
        );

        Ok(ClaimOutcome::Claimed(claimed))
    }

    async fn record_position(&self, report: PositionReport) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        let owns_trip = tables
            .routes
            .get(&report.route_id)
            .map_or(false, |route| route.is_active_for(report.driver_id));
        if !owns_trip {
            return Ok(false);
        }

        match tables.locations.get_mut(&report.route_id) {
            Some(location) if is_older(report.reported_at, location.reported_at) => Ok(false),
            Some(location) => {
                location.latitude = report.position.latitude;
                location.longitude = report.position.longitude;
                location.last_updated = report.received_at;
                location.reported_at = report.reported_at.or(location.reported_at);
                Ok(true)
            }
            None => {
                tables.locations.insert(
                    report.route_id,
                    BusLocation {
                        route_id: report.route_id,
                        latitude: report.position.latitude,
                        longitude: report.position.longitude,
                        current_stop_id: None,
                        last_updated: report.received_at,
                        reported_at: report.reported_at,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn advance_stop(&self, advance: StopAdvance) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        let owns_trip = tables
            .routes
            .get(&advance.route_id)
            .map_or(false, |route| route.is_active_for(advance.driver_id));
        if !owns_trip {
            return Ok(false);
        }

        match tables.locations.get_mut(&advance.route_id) {
            Some(location) if location.current_stop_id == Some(advance.from_stop_id) => {
                location.current_stop_id = Some(advance.to_stop_id);
                location.last_updated = advance.at;
            }
            _ => return Ok(false),
        }

        if advance.completes_trip {
            if let Some(route) = tables.routes.get_mut(&advance.route_id) {
                route.status = RouteStatus::Completed;
                route.updated_at = advance.at;
            }
            tables.clear_active_route(advance.driver_id, advance.route_id);
        }

        Ok(true)
    }

    async fn finish_trip(&self, route_id: Uuid, driver_id: Uuid) -> AppResult<Option<Route>> {
        let mut tables = self.tables.write().await;

        let route = match tables.routes.get_mut(&route_id) {
            Some(route) if route.is_active_for(driver_id) => route,
            _ => return Ok(None),
        };

        route.status = RouteStatus::Completed;
        route.updated_at = Utc::now();
        let finished = route.clone();

        tables.clear_active_route(driver_id, route_id);
        Ok(Some(finished))
    }

    async fn insert_student_count(&self, stop_id: Uuid, count: i32) -> AppResult<StudentCount> {
        let row = StudentCount {
            id: Uuid::new_v4(),
            stop_id,
            count,
            created_at: Utc::now(),
        };

        self.tables.write().await.counts.push(row.clone());
        Ok(row)
    }

    async fn latest_student_count(&self, stop_id: Uuid) -> AppResult<Option<StudentCount>> {
        let tables = self.tables.read().await;
        Ok(tables.counts.iter().rev().find(|row| row.stop_id == stop_id).cloned())
    }

    async fn load_tracking_snapshot(&self, route_id: Uuid) -> AppResult<Option<TrackingSnapshot>> {
        let tables = self.tables.read().await;

        let route = match tables.routes.get(&route_id) {
            Some(route) => route.clone(),
            None => return Ok(None),
        };
        let stops = tables.stops.get(&route_id).cloned().unwrap_or_default();

        let mut latest_counts = HashMap::new();
        for row in &tables.counts {
            if stops.iter().any(|stop| stop.id == row.stop_id) {
                latest_counts.insert(row.stop_id, row.count);
            }
        }

        Ok(Some(TrackingSnapshot {
            route,
            stops,
            location: tables.locations.get(&route_id).cloned(),
            latest_counts,
        }))
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(conflict_error("User", "email", &user.email));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            name: user.name,
            driver_number: user.driver_number,
            active_route_id: None,
            created_at: Utc::now(),
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, UserRole};

    async fn seeded() -> (MemoryShuttleRepository, Route, Vec<Stop>) {
        let repo = MemoryShuttleRepository::new();
        let route = repo
            .insert_route(NewRoute {
                name: "HINJEWADI".to_string(),
                shift_number: ShiftNumber::try_from(1).unwrap(),
                shift_timing: Some("7:00 AM".to_string()),
                start_time: "6:00 AM".to_string(),
                departure_time: "6:10 AM".to_string(),
                vehicle_number: "MH12 AB 1234".to_string(),
                driver_name: None,
                driver_mobile: None,
            })
            .await
            .unwrap();
        let stops = repo
            .insert_stops(
                route.id,
                vec![
                    NewStop { sequence_number: 2, name: "Wakad".to_string(), pickup_time: None, coordinates: None },
                    NewStop { sequence_number: 1, name: "Phase 1".to_string(), pickup_time: None, coordinates: None },
                ],
            )
            .await
            .unwrap();
        (repo, route, stops)
    }

    fn begin(route: &Route, driver_id: Uuid, first_stop_id: Uuid) -> BeginTrip {
        BeginTrip {
            route_id: route.id,
            driver_id,
            driver_name: "Ravi".to_string(),
            driver_mobile: None,
            position: Coordinates::new(18.59, 73.73),
            first_stop_id,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_stops_are_sorted_by_sequence() {
        let (_, _, stops) = seeded().await;
        assert_eq!(stops[0].name, "Phase 1");
        assert_eq!(stops[1].name, "Wakad");
    }

    #[tokio::test]
    async fn test_second_driver_is_held_off() {
        let (repo, route, stops) = seeded().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(matches!(repo.begin_trip(begin(&route, a, stops[0].id)).await.unwrap(), ClaimOutcome::Claimed(_)));
        match repo.begin_trip(begin(&route, b, stops[0].id)).await.unwrap() {
            ClaimOutcome::HeldBy(held) => assert_eq!(held.driver_id, Some(a)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    fn report(route: &Route, driver_id: Uuid, latitude: f64, reported_at: Option<DateTime<Utc>>) -> PositionReport {
        PositionReport {
            route_id: route.id,
            driver_id,
            position: Coordinates::new(latitude, 73.7),
            reported_at,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_stale_position_is_dropped() {
        let (repo, route, stops) = seeded().await;
        let driver = Uuid::new_v4();
        repo.begin_trip(begin(&route, driver, stops[0].id)).await.unwrap();

        let device = Utc::now();
        assert!(repo.record_position(report(&route, driver, 18.6, Some(device))).await.unwrap());

        let older = device - chrono::Duration::seconds(30);
        assert!(!repo.record_position(report(&route, driver, 0.0, Some(older))).await.unwrap());

        let newer = device + chrono::Duration::seconds(5);
        assert!(repo.record_position(report(&route, driver, 18.7, Some(newer))).await.unwrap());

        let location = repo.find_bus_location(route.id).await.unwrap().unwrap();
        assert_eq!(location.latitude, 18.7);
        assert_eq!(location.reported_at, Some(newer));
        assert_eq!(location.current_stop_id, Some(stops[0].id));
    }

    #[tokio::test]
    async fn test_device_clock_behind_server_is_not_stale() {
        let (repo, route, stops) = seeded().await;
        let driver = Uuid::new_v4();
        repo.begin_trip(begin(&route, driver, stops[0].id)).await.unwrap();

        // Dispositivo 30 s atrasado respecto al servidor
        let device = Utc::now() - chrono::Duration::seconds(30);
        assert!(repo.record_position(report(&route, driver, 18.6, Some(device))).await.unwrap());

        let advance = StopAdvance {
            route_id: route.id,
            driver_id: driver,
            from_stop_id: stops[0].id,
            to_stop_id: stops[1].id,
            completes_trip: false,
            at: Utc::now(),
        };
        assert!(repo.advance_stop(advance).await.unwrap());

        let next = device + chrono::Duration::seconds(10);
        assert!(repo.record_position(report(&route, driver, 18.7, Some(next))).await.unwrap());

        let location = repo.find_bus_location(route.id).await.unwrap().unwrap();
        assert_eq!(location.latitude, 18.7);
        assert_eq!(location.current_stop_id, Some(stops[1].id));
        assert!(location.last_updated > next);
    }

    #[tokio::test]
    async fn test_restart_forgets_device_clock() {
        let (repo, route, stops) = seeded().await;
        let driver = Uuid::new_v4();
        repo.begin_trip(begin(&route, driver, stops[0].id)).await.unwrap();
        let device = Utc::now();
        assert!(repo.record_position(report(&route, driver, 18.6, Some(device))).await.unwrap());

        repo.begin_trip(begin(&route, driver, stops[0].id)).await.unwrap();

        let earlier = device - chrono::Duration::minutes(5);
        assert!(repo.record_position(report(&route, driver, 18.5, Some(earlier))).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_sequence_leaves_stops_untouched() {
        let (repo, route, stops) = seeded().await;

        let err = repo
            .insert_stops(
                route.id,
                vec![
                    NewStop { sequence_number: 3, name: "Hinjewadi".to_string(), pickup_time: None, coordinates: None },
                    NewStop { sequence_number: 2, name: "Wakad again".to_string(), pickup_time: None, coordinates: None },
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let err = repo
            .insert_stops(
                route.id,
                vec![
                    NewStop { sequence_number: 4, name: "A".to_string(), pickup_time: None, coordinates: None },
                    NewStop { sequence_number: 4, name: "B".to_string(), pickup_time: None, coordinates: None },
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        assert_eq!(repo.list_stops(route.id).await.unwrap(), stops);
    }

    #[tokio::test]
    async fn test_advance_is_compare_and_set() {
        let (repo, route, stops) = seeded().await;
        let driver = Uuid::new_v4();
        repo.begin_trip(begin(&route, driver, stops[0].id)).await.unwrap();

        let advance = StopAdvance {
            route_id: route.id,
            driver_id: driver,
            from_stop_id: stops[0].id,
            to_stop_id: stops[1].id,
            completes_trip: true,
            at: Utc::now(),
        };
        assert!(repo.advance_stop(advance.clone()).await.unwrap());
        assert!(!repo.advance_stop(advance).await.unwrap());

        let route = repo.find_route(route.id).await.unwrap().unwrap();
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[tokio::test]
    async fn test_latest_count_wins() {
        let (repo, _, stops) = seeded().await;
        for count in [3, 7, 2] {
            repo.insert_student_count(stops[0].id, count).await.unwrap();
        }

        let latest = repo.latest_student_count(stops[0].id).await.unwrap().unwrap();
        assert_eq!(latest.count, 2);
        assert!(repo.latest_student_count(stops[1].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = MemoryShuttleRepository::new();
        let new_user = NewUser {
            email: "driver@campus.edu".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Driver,
            name: "Ravi".to_string(),
            driver_number: Some("D-7".to_string()),
        };

        repo.insert_user(new_user.clone()).await.unwrap();
        let err = repo.insert_user(new_user).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }
}
