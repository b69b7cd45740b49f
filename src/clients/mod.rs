//! Clients - HTTP clients
//!
//! Cliente del propio backend, usado por el agente del conductor.

pub mod shuttle_api_client;

pub use shuttle_api_client::ShuttleApiClient;
