//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL, más los modelos derivados (viaje y seguimiento).

pub mod bus_location;
pub mod coordinates;
pub mod route;
pub mod session;
pub mod stop;
pub mod student_count;
pub mod tracking;
pub mod trip;
pub mod user;

pub use bus_location::BusLocation;
pub use coordinates::Coordinates;
pub use route::{NewRoute, Route, RouteStatus, ShiftInfo, ShiftNumber};
pub use session::Session;
pub use stop::{index_of, NewStop, Stop};
pub use student_count::StudentCount;
pub use tracking::{StopDisplayClass, StopView, TrackingSnapshot, TrackingView};
pub use trip::TripState;
pub use user::{NewUser, User, UserResponse, UserRole};
