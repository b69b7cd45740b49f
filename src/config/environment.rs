//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todas las variables tienen un valor por defecto de desarrollo, excepto
//! `DATABASE_URL` cuando el backend de almacenamiento es PostgreSQL.

use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Errores de configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Backend de almacenamiento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            _ => Err(()),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub listen_for_notifications: bool,
    pub seed_on_startup: bool,
    pub bcrypt_cost: u32,
    pub log_level: tracing::Level,
    /// Cuenta admin creada al arrancar si ambas variables están definidas
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "dev-secret-change-in-production".to_string(),
            jwt_expiration: 86_400,
            cors_origins: Vec::new(),
            storage_backend: StorageBackend::Memory,
            database_url: None,
            listen_for_notifications: false,
            seed_on_startup: true,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            log_level: tracing::Level::INFO,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl EnvironmentConfig {
    /// Cargar la configuración desde variables de entorno
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_backend = parse_var("STORAGE_BACKEND", defaults.storage_backend)?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing { name: "DATABASE_URL" });
        }

        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);
        if environment == "production" && jwt_secret == Self::default().jwt_secret {
            return Err(ConfigError::Missing { name: "JWT_SECRET" });
        }

        Ok(Self {
            environment,
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            storage_backend,
            database_url,
            listen_for_notifications: parse_var("LISTEN_FOR_NOTIFICATIONS", defaults.listen_for_notifications)?,
            seed_on_startup: parse_var("SEED_ON_STARTUP", defaults.seed_on_startup)?,
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost)?,
            log_level: parse_var("LOG_LEVEL", defaults.log_level)?,
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
