//! # coverctld: cover control daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Start one controller per configured cover
//! - Feed the sun entity from the ephemeris when asked to
//! - Build the axum router and serve until SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use coverctl_adapter_http_axum::state::AppState;
use coverctl_adapter_virtual::{VirtualActuator, VirtualSun};
use coverctl_app::event_bus::InProcessEventBus;
use coverctl_app::ports::SystemClock;
use coverctl_app::sensor_store::SensorStore;
use coverctl_app::services::cover_service::{CoverService, ServiceRuntime};
use coverctl_app::services::diagnostics_board::DiagnosticsBoard;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    if config.covers.is_empty() {
        tracing::warn!("no covers configured, nothing will be automated");
    }

    // Diagnostics
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let board = Arc::new(DiagnosticsBoard::new(Arc::clone(&event_bus)));

    // Controllers
    let site = config.site();
    let actuator = VirtualActuator::new();
    let service = Arc::new(CoverService::start(
        config.covers.clone(),
        &site,
        actuator,
        ServiceRuntime {
            sensors: SensorStore::new(),
            board,
            clock: Arc::new(SystemClock),
            settings: config.controller_settings(),
            enabled: config.engine.enabled,
        },
    )?);

    // Sun feed
    let sun_task = match (config.location(), &config.site.sun_entity) {
        (Some(location), Some(entity)) if config.site.virtual_sun => Some(
            VirtualSun::new(location, entity.clone()).spawn(
                Arc::clone(&service),
                SystemClock,
                Duration::from_secs(config.engine.sun_update_secs.max(1)),
            ),
        ),
        _ => None,
    };

    // HTTP
    let app = coverctl_adapter_http_axum::router::build(AppState::new(
        Arc::clone(&service),
        event_bus,
    ));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, covers = config.covers.len(), "coverctld listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = sun_task {
        task.abort();
    }
    service.shutdown();
    tracing::info!("coverctld stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
