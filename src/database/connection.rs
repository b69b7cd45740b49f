//! Configuración de conexión a PostgreSQL
//!
//! Este módulo abre el pool y aplica las migraciones embebidas.

use sqlx::PgPool;
use tracing::info;

use crate::config::database::DatabaseConfig;

/// Crear un pool de conexiones y aplicar migraciones
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("🗄️ Conectando a {}", mask_database_url(database_url));

    let pool = DatabaseConfig::new(database_url).create_pool().await?;
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Ejecutar migraciones de la base de datos
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("✅ Migraciones aplicadas");
    Ok(())
}

/// Función helper para enmascarar la URL de la base de datos en logs
pub fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
