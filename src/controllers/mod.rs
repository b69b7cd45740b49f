//! Controllers: validan la request y delegan en servicios/repositorios

pub mod auth_controller;
pub mod route_controller;
pub mod student_count_controller;
pub mod tracking_controller;
pub mod trip_controller;
