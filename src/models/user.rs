//! Modelo de User
//!
//! Este módulo contiene el struct User y su rol. El hash de la contraseña
//! nunca sale del servidor: las respuestas usan `UserResponse`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Rol del usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Driver,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Driver => "driver",
            UserRole::Admin => "admin",
        }
    }
}

/// User - mapea exactamente a la tabla users
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub name: String,
    pub driver_number: Option<String>,
    pub active_route_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Datos para crear un usuario (contraseña ya hasheada)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub name: String,
    pub driver_number: Option<String>,
}

/// Response de usuario para la API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub name: String,
    pub driver_number: Option<String>,
    pub active_route_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            name: user.name,
            driver_number: user.driver_number,
            active_route_id: user.active_route_id,
            created_at: user.created_at,
        }
    }
}
