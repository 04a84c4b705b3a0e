use color_eyre::{eyre::eyre, Result};
use dronecam::config::EngineConfig;
use dronecam::controller::{ControllerStatus, GilrsBackend};
use dronecam::engine::{Engine, EngineHandle, EngineStatus};
use dronecam::transport::{TransportStatus, UdpSink};
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = EngineConfig::load()
        .await
        .map_err(|e| eyre!("Failed to load config: {}", e))?;

    let backend = GilrsBackend::new().map_err(|e| eyre!("Failed to open controllers: {}", e))?;
    let sink = UdpSink::bind(config.network.send_addr()).await?;

    let (engine, handle) = Engine::create(config, Box::new(backend), Box::new(sink))?;
    let engine = engine.start().await?;
    let network = &engine.config().network;
    info!(
        "OSC out {}, in {}",
        network.send_addr(),
        network.receive_addr()
    );

    tokio::spawn(log_status_changes(handle.subscribe()));
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    let stopped = engine.run_until_shutdown().await;
    info!("Final pose: {:?}", stopped.pose());
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

async fn shutdown_on_ctrl_c(handle: EngineHandle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    handle.shutdown();
}

/// Logs controller and transport transitions until the engine goes away
async fn log_status_changes(mut status_rx: watch::Receiver<EngineStatus>) {
    let mut controller = ControllerStatus::default();
    let mut transport = TransportStatus::default();

    while status_rx.changed().await.is_ok() {
        let status = status_rx.borrow_and_update().clone();
        if status.controller != controller {
            info!("Controller: {}", status.controller);
            controller = status.controller;
        }
        if status.transport != transport {
            info!("Transport: {}", status.transport);
            transport = status.transport;
        }
    }
}
