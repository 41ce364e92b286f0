//! Demo binary: run the UDP discovery bridge and log every device seen on
//! the network. Wiring only — the core logic lives in `switcher::discovery`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use switcher::device::Device;
use switcher::discovery::{Bridge, DeviceSink, UDP_PORT_TYPE1, UDP_PORT_TYPE2};

/// Discovery-binary configuration, read from the environment the way the
/// library's host applications are expected to configure themselves —
/// the library itself takes constructor parameters and never touches the
/// environment.
struct Config {
    ports: Vec<u16>,
}

impl Config {
    fn from_env() -> Result<Self> {
        let ports = match std::env::var("SWITCHER_DISCOVERY_PORTS") {
            Ok(raw) => raw
                .split(',')
                .map(|p| p.trim().parse::<u16>().context("SWITCHER_DISCOVERY_PORTS must be a comma-separated port list"))
                .collect::<Result<Vec<_>>>()?,
            Err(_) => vec![UDP_PORT_TYPE1, UDP_PORT_TYPE2],
        };
        Ok(Self { ports })
    }
}

struct LoggingSink;

impl DeviceSink for LoggingSink {
    fn on_device(&self, device: Device) {
        match device {
            Device::WaterHeater(w) => info!(
                device_id = %w.identity.device_id, ip = %w.identity.ip, state = ?w.state,
                power_watts = w.power_watts, "water heater"
            ),
            Device::PowerPlug(p) => info!(
                device_id = %p.identity.device_id, ip = %p.identity.ip, state = ?p.state,
                power_watts = p.power_watts, "power plug"
            ),
            Device::Shutter(s) => info!(
                device_id = %s.identity.device_id, ip = %s.identity.ip,
                position = s.position, direction = ?s.direction, "shutter"
            ),
            Device::Thermostat(t) => info!(
                device_id = %t.identity.device_id, ip = %t.identity.ip, state = ?t.state,
                mode = %t.mode, target_temp = t.target_temp, "breeze thermostat"
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let bridge = Arc::new(Bridge::with_ports(LoggingSink, config.ports.clone()));

    bridge.start().await.context("failed to start the discovery bridge")?;
    info!(ports = ?config.ports, "discovery bridge running, press ctrl-c to stop");

    shutdown_signal().await;

    info!("shutdown signal received");
    bridge.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
