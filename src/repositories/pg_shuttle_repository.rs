use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    BusLocation, NewRoute, NewStop, NewUser, Route, ShiftInfo, ShiftNumber, Stop,
    StudentCount, TrackingSnapshot, User,
};
use crate::repositories::shuttle_repository::{
    BeginTrip, ClaimOutcome, PositionReport, ShuttleRepository, StopAdvance,
};
use crate::utils::errors::{conflict_error, AppError, AppResult};

/// Repositorio PostgreSQL (sqlx)
pub struct PgShuttleRepository {
    pool: PgPool,
}

impl PgShuttleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShuttleRepository for PgShuttleRepository {
    async fn count_routes(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM routes")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn insert_route(&self, route: NewRoute) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (id, name, shift_number, shift_timing, start_time, departure_time,
                                vehicle_number, driver_name, driver_mobile, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'inactive', $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(route.name)
        .bind(route.shift_number)
        .bind(route.shift_timing)
        .bind(route.start_time)
        .bind(route.departure_time)
        .bind(route.vehicle_number)
        .bind(route.driver_name)
        .bind(route.driver_mobile)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(route)
    }

    async fn insert_stops(&self, route_id: Uuid, stops: Vec<NewStop>) -> AppResult<Vec<Stop>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(stops.len());

        for stop in stops {
            let row = sqlx::query_as::<_, Stop>(
                r#"
                INSERT INTO stops (id, route_id, sequence_number, name, pickup_time, latitude, longitude, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(route_id)
            .bind(stop.sequence_number)
            .bind(stop.name)
            .bind(stop.pickup_time)
            .bind(stop.coordinates.map(|c| c.latitude))
            .bind(stop.coordinates.map(|c| c.longitude))
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

            inserted.push(row);
        }

        tx.commit().await?;
        inserted.sort_by_key(|stop| stop.sequence_number);
        Ok(inserted)
    }

    async fn list_routes(&self, shift: Option<ShiftNumber>) -> AppResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE $1::SMALLINT IS NULL OR shift_number = $1
            ORDER BY name, shift_number
            "#,
        )
        .bind(shift)
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    async fn list_shifts(&self) -> AppResult<Vec<ShiftInfo>> {
        let shifts = sqlx::query_as::<_, ShiftInfo>(
            r#"
            SELECT DISTINCT ON (shift_number) shift_number, shift_timing
            FROM routes
            ORDER BY shift_number, shift_timing
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    async fn find_route(&self, route_id: Uuid) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(route_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(route)
    }

    async fn list_stops(&self, route_id: Uuid) -> AppResult<Vec<Stop>> {
        let stops = sqlx::query_as::<_, Stop>(
            "SELECT * FROM stops WHERE route_id = $1 ORDER BY sequence_number",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stops)
    }

    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<Stop>> {
        let stop = sqlx::query_as::<_, Stop>("SELECT * FROM stops WHERE id = $1")
            .bind(stop_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stop)
    }

    async fn find_bus_location(&self, route_id: Uuid) -> AppResult<Option<BusLocation>> {
        let location = sqlx::query_as::<_, BusLocation>("SELECT * FROM bus_locations WHERE route_id = $1")
            .bind(route_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    async fn begin_trip(&self, trip: BeginTrip) -> AppResult<ClaimOutcome> {
        let mut tx = self.pool.begin().await?;

        // Reclamo condicional: otro conductor con el viaje activo bloquea la escritura
        let claimed = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET driver_id = $2, driver_name = $3, driver_mobile = COALESCE($4, driver_mobile),
                status = 'active', updated_at = $5
            WHERE id = $1 AND (status <> 'active' OR driver_id = $2)
            RETURNING *
            "#,
        )
        .bind(trip.route_id)
        .bind(trip.driver_id)
        .bind(&trip.driver_name)
        .bind(&trip.driver_mobile)
        .bind(trip.at)
        .fetch_optional(&mut *tx)
        .await?;

        let route = match claimed {
            Some(route) => route,
            None => {
                tx.rollback().await?;
                return Ok(match self.find_route(trip.route_id).await? {
                    Some(route) => ClaimOutcome::HeldBy(route),
                    None => ClaimOutcome::RouteNotFound,
                });
            }
        };

        sqlx::query("UPDATE users SET active_route_id = $1 WHERE id = $2")
            .bind(trip.route_id)
            .bind(trip.driver_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO bus_locations (route_id, latitude, longitude, current_stop_id, last_updated, reported_at)
            VALUES ($1, $2, $3, $4, $5, NULL)
            ON CONFLICT (route_id) DO UPDATE
            SET latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude,
                current_stop_id = EXCLUDED.current_stop_id, last_updated = EXCLUDED.last_updated,
                reported_at = NULL
            "#,
        )
        .bind(trip.route_id)
        .bind(trip.position.latitude)
        .bind(trip.position.longitude)
        .bind(trip.first_stop_id)
        .bind(trip.at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ClaimOutcome::Claimed(route))
    }

    async fn record_position(&self, report: PositionReport) -> AppResult<bool> {
        // Gana la última escritura según el reloj del dispositivo; sin marca, entra
        let result = sqlx::query(
            r#"
            INSERT INTO bus_locations (route_id, latitude, longitude, current_stop_id, last_updated, reported_at)
            SELECT r.id, $3, $4, NULL, $5, $6
            FROM routes r
            WHERE r.id = $1 AND r.status = 'active' AND r.driver_id = $2
            ON CONFLICT (route_id) DO UPDATE
            SET latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude,
                last_updated = EXCLUDED.last_updated,
                reported_at = COALESCE(EXCLUDED.reported_at, bus_locations.reported_at)
            WHERE EXCLUDED.reported_at IS NULL
               OR bus_locations.reported_at IS NULL
               OR bus_locations.reported_at <= EXCLUDED.reported_at
            "#,
        )
        .bind(report.route_id)
        .bind(report.driver_id)
        .bind(report.position.latitude)
        .bind(report.position.longitude)
        .bind(report.received_at)
        .bind(report.reported_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn advance_stop(&self, advance: StopAdvance) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            r#"
            UPDATE bus_locations b
            SET current_stop_id = $4, last_updated = $5
            FROM routes r
            WHERE b.route_id = $1 AND r.id = b.route_id
              AND r.status = 'active' AND r.driver_id = $2
              AND b.current_stop_id = $3
            "#,
        )
        .bind(advance.route_id)
        .bind(advance.driver_id)
        .bind(advance.from_stop_id)
        .bind(advance.to_stop_id)
        .bind(advance.at)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if advance.completes_trip {
            sqlx::query(
                "UPDATE routes SET status = 'completed', updated_at = $3 WHERE id = $1 AND driver_id = $2 AND status = 'active'",
            )
            .bind(advance.route_id)
            .bind(advance.driver_id)
            .bind(advance.at)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE users SET active_route_id = NULL WHERE id = $1 AND active_route_id = $2")
                .bind(advance.driver_id)
                .bind(advance.route_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn finish_trip(&self, route_id: Uuid, driver_id: Uuid) -> AppResult<Option<Route>> {
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes SET status = 'completed', updated_at = $3
            WHERE id = $1 AND driver_id = $2 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(route_id)
        .bind(driver_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        if route.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE users SET active_route_id = NULL WHERE id = $1 AND active_route_id = $2")
            .bind(driver_id)
            .bind(route_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(route)
    }

    async fn insert_student_count(&self, stop_id: Uuid, count: i32) -> AppResult<StudentCount> {
        let row = sqlx::query_as::<_, StudentCount>(
            r#"
            INSERT INTO student_counts (id, stop_id, count, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(stop_id)
        .bind(count)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn latest_student_count(&self, stop_id: Uuid) -> AppResult<Option<StudentCount>> {
        let row = sqlx::query_as::<_, StudentCount>(
            "SELECT * FROM student_counts WHERE stop_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(stop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn load_tracking_snapshot(&self, route_id: Uuid) -> AppResult<Option<TrackingSnapshot>> {
        // Una sola transacción repeatable read: las cuatro lecturas ven el mismo estado
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let route = match sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(route) => route,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let stops = sqlx::query_as::<_, Stop>(
            "SELECT * FROM stops WHERE route_id = $1 ORDER BY sequence_number",
        )
        .bind(route_id)
        .fetch_all(&mut *tx)
        .await?;

        let location = sqlx::query_as::<_, BusLocation>("SELECT * FROM bus_locations WHERE route_id = $1")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?;

        let counts = sqlx::query_as::<_, (Uuid, i32)>(
            r#"
            SELECT DISTINCT ON (sc.stop_id) sc.stop_id, sc.count
            FROM student_counts sc
            JOIN stops s ON s.id = sc.stop_id
            WHERE s.route_id = $1
            ORDER BY sc.stop_id, sc.created_at DESC
            "#,
        )
        .bind(route_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(TrackingSnapshot {
            route,
            stops,
            location,
            latest_counts: counts.into_iter().collect(),
        }))
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let email = user.email.clone();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, role, name, driver_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.name)
        .bind(user.driver_number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => conflict_error("User", "email", &email),
            other => AppError::Database(other),
        })
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
