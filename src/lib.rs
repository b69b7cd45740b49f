//! Campus Shuttle - backend de seguimiento de shuttles del campus
//!
//! Conductores toman una ruta, reportan su posición y avanzan parada por
//! parada; estudiantes siguen el progreso en vivo y reportan cuántos esperan.

pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
