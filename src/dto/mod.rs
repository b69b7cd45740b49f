//! DTOs de request/response de la API

pub mod auth_dto;
pub mod common_dto;
pub mod route_dto;
pub mod student_count_dto;
pub mod trip_dto;

pub use common_dto::ApiResponse;
