//! Repositorios
//!
//! Acceso a datos detrás del trait `ShuttleRepository`: PostgreSQL en
//! producción y una implementación en memoria para desarrollo y tests.

pub mod memory_shuttle_repository;
pub mod pg_shuttle_repository;
pub mod shuttle_repository;

pub use memory_shuttle_repository::MemoryShuttleRepository;
pub use pg_shuttle_repository::PgShuttleRepository;
pub use shuttle_repository::{BeginTrip, ClaimOutcome, PositionReport, ShuttleRepository, StopAdvance};
