//! Middleware del sistema
//!
//! Autenticación por sesión, guards de rol y CORS.

pub mod auth;
pub mod cors;

pub use auth::*;
pub use cors::*;
