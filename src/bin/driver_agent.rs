//! Agente del conductor
//!
//! Inicia sesión, toma la ruta y reporta la posición cada pocos segundos
//! hasta que el viaje termina o llega Ctrl+C.
//!
//! Variables: `SHUTTLE_API_URL`, `DRIVER_EMAIL`, `DRIVER_PASSWORD`,
//! `DRIVER_ROUTE_ID`, `REPORT_INTERVAL_SECS` (5..=10), `POSITION_REPLAY_FILE`.

use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use campus_shuttle::clients::ShuttleApiClient;
use campus_shuttle::services::driver_agent::{AgentConfig, AgentExit, DriverAgent, DEFAULT_INTERVAL_SECS};
use campus_shuttle::services::geolocation::ReplayPositionSource;

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let base_url = env::var("SHUTTLE_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let email = required("DRIVER_EMAIL")?;
    let password = required("DRIVER_PASSWORD")?;
    let route_id: Uuid = required("DRIVER_ROUTE_ID")?
        .parse()
        .context("DRIVER_ROUTE_ID must be a UUID")?;
    let interval_secs: u64 = match env::var("REPORT_INTERVAL_SECS") {
        Ok(value) => value.parse().context("REPORT_INTERVAL_SECS must be a number")?,
        Err(_) => DEFAULT_INTERVAL_SECS,
    };
    let source = ReplayPositionSource::from_file(required("POSITION_REPLAY_FILE")?)?;

    let config = AgentConfig::new(route_id, interval_secs);
    info!("🚌 Agente del conductor para la ruta {} cada {:?}", route_id, config.interval);

    let client = ShuttleApiClient::login(&base_url, &email, &password)
        .await
        .context("login failed")?;
    info!("✅ Sesión iniciada como {}", email);

    let mut agent = DriverAgent::new(client, source, config);
    agent.start().await.context("could not start trip")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Señal Ctrl+C recibida"),
            Err(e) => {
                warn!("⚠️ No se pudo escuchar Ctrl+C: {}", e);
                // soltar el sender también detendría al agente
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    match agent.run(shutdown_rx).await {
        AgentExit::TripFinished => info!("🏁 Viaje completado"),
        AgentExit::Shutdown => info!("👋 Agente detenido; el viaje sigue activo"),
    }

    Ok(())
}
