use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};

use campus_shuttle::config::environment::{EnvironmentConfig, StorageBackend};
use campus_shuttle::database::{connect_and_migrate, mask_database_url};
use campus_shuttle::repositories::{MemoryShuttleRepository, PgShuttleRepository, ShuttleRepository};
use campus_shuttle::routes::create_router;
use campus_shuttle::services::change_feed::spawn_pg_listener;
use campus_shuttle::services::{AuthService, SeedData, SeedService};
use campus_shuttle::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    // Configurar logging
    tracing_subscriber::fmt().with_max_level(config.log_level).init();

    info!("🚌 Campus Shuttle Tracker");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    let (repo, pool) = match config.storage_backend {
        StorageBackend::Memory => {
            warn!("⚠️ Almacenamiento en memoria: los datos se pierden al reiniciar");
            let repo: Arc<dyn ShuttleRepository> = Arc::new(MemoryShuttleRepository::new());
            (repo, None)
        }
        StorageBackend::Postgres => {
            let url = config.database_url.clone().context("DATABASE_URL must be set")?;
            let pool = match connect_and_migrate(&url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a {}: {}", mask_database_url(&url), e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ PostgreSQL conectado");
            let repo: Arc<dyn ShuttleRepository> = Arc::new(PgShuttleRepository::new(pool.clone()));
            (repo, Some(pool))
        }
    };

    let state = AppState::new(repo.clone(), config.clone());

    if config.listen_for_notifications {
        match pool {
            Some(pool) => {
                spawn_pg_listener(pool, state.feed.clone());
            }
            None => warn!("⚠️ LISTEN_FOR_NOTIFICATIONS ignorado: requiere PostgreSQL"),
        }
    }

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let auth = AuthService::new(repo.clone(), state.sessions.clone(), state.jwt.clone(), config.bcrypt_cost);
        auth.ensure_admin(email, password)
            .await
            .context("could not create admin account")?;
    }

    if config.seed_on_startup {
        let data = SeedData::bundled()?;
        SeedService::new(repo.clone()).seed(&data).await?;
    }

    state.spawn_session_cleanup(Duration::from_secs(300));

    let app = create_router(state);

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio");
    info!("🔐 Auth:");
    info!("   POST /api/auth/signup | /api/auth/login | /api/auth/logout");
    info!("   GET  /api/auth/me");
    info!("🗺️ Rutas:");
    info!("   GET  /api/shifts | /api/routes?shift=N | /api/routes/:route_id");
    info!("🚌 Viajes (conductor):");
    info!("   POST /api/trips/:route_id/start | position | advance | complete");
    info!("   GET  /api/trips/active");
    info!("📡 Seguimiento:");
    info!("   GET  /api/tracking/:route_id | /api/tracking/:route_id/stream");
    info!("🧍 Conteo de estudiantes:");
    info!("   GET/POST /api/stops/:stop_id/count");
    info!("🌱 Admin:");
    info!("   POST /api/admin/seed");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
