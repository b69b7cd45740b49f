//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación. Los servicios
//! combinan el repositorio, la máquina de estados y el feed de cambios.

pub mod auth_service;
pub mod change_feed;
pub mod driver_agent;
pub mod geolocation;
pub mod proximity;
pub mod seed_service;
pub mod student_count_ledger;
pub mod tracking_read_model;
pub mod tracking_service;
pub mod trip_service;
pub mod trip_state_machine;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::AuthService;
pub use change_feed::{ChangeFeed, ChangedTable, RouteChange};
pub use seed_service::{SeedData, SeedService};
pub use student_count_ledger::StudentCountLedger;
pub use tracking_service::TrackingService;
pub use trip_service::{TripService, TripUpdate};
