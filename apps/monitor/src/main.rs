//! Subnet Monitor - headless scanner, poller and control CLI for Sonos
//! speakers on a known subnet.

mod config;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use subnet_core::{
    bootstrap_services, find_control, BootstrappedServices, ControlValue, Coordinator,
    DeviceRecord, DeviceSnapshot, DeviceState,
};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use crate::config::MonitorConfig;

/// Subnet Monitor - discover, watch and control Sonos speakers.
#[derive(Parser, Debug)]
#[command(name = "subnet-monitor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(
        short,
        long,
        default_value = "info",
        env = "SUBNET_LOG_LEVEL",
        global = true
    )]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe every host of a subnet and print the speakers found.
    Scan {
        /// Subnet in CIDR notation, e.g. 192.168.1.0/24.
        cidr: String,
        /// Per-host probe timeout in seconds.
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Check whether one address is a speaker.
    Probe {
        address: String,
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Track speakers and print events as JSON lines until interrupted.
    Watch {
        /// Additional speaker address (repeatable).
        #[arg(short, long = "speaker")]
        speakers: Vec<String>,
        /// Also print every snapshot after each cycle.
        #[arg(long)]
        snapshots: bool,
    },
    /// Apply one control (e.g. `volume 30`, `night_mode on`) and print the result.
    Control {
        address: String,
        key: String,
        value: String,
    },
    /// Poll one speaker once and print its state.
    Status { address: String },
}

/// Everything known about one speaker, as printed by `status` and `control`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerReport {
    address: String,
    state: Option<DeviceState>,
    record: Option<DeviceRecord>,
    snapshot: Option<DeviceSnapshot>,
}

impl SpeakerReport {
    fn of(coordinator: &Coordinator, address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: coordinator.state(address),
            record: coordinator.record(address),
            snapshot: coordinator.snapshot(address),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Subnet Monitor v{}", env!("CARGO_PKG_VERSION"));

    let config =
        MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let mut core_config = config.to_core_config();

    match args.command {
        Command::Scan { cidr, timeout } => {
            if let Some(timeout) = timeout {
                core_config.scan_timeout_secs = timeout;
            }
            let services = bootstrap(&core_config)?;
            let records = services
                .coordinator
                .scan(&cidr)
                .await
                .with_context(|| format!("Failed to scan {cidr}"))?;
            print_json(&records)?;
        }
        Command::Probe { address, timeout } => {
            if let Some(timeout) = timeout {
                core_config.scan_timeout_secs = timeout;
            }
            let services = bootstrap(&core_config)?;
            let record = services
                .coordinator
                .probe(&address)
                .await
                .with_context(|| format!("Failed to probe {address}"))?;
            print_json(&record)?;
        }
        Command::Watch {
            speakers,
            snapshots,
        } => {
            let services = bootstrap(&core_config)?;
            let addresses: Vec<String> = config.speaker_ips.iter().chain(&speakers).cloned().collect();
            watch(&services, &addresses, snapshots).await?;
        }
        Command::Control {
            address,
            key,
            value,
        } => {
            let services = bootstrap(&core_config)?;
            let coordinator = &services.coordinator;
            let control =
                find_control(&key).ok_or_else(|| anyhow!("Unknown control: {key}"))?;
            let value = ControlValue::parse(control.kind, &value)?;

            track_and_poll(coordinator, &address).await?;
            coordinator
                .apply_control(&address, &key, value)
                .await
                .with_context(|| format!("Failed to set {key} on {address}"))?;
            if control.approximate {
                log::warn!("{} is approximate on this device", control.name);
            }
            print_json(&SpeakerReport::of(coordinator, &address))?;
        }
        Command::Status { address } => {
            let services = bootstrap(&core_config)?;
            track_and_poll(&services.coordinator, &address).await?;
            print_json(&SpeakerReport::of(&services.coordinator, &address))?;
        }
    }

    Ok(())
}

fn bootstrap(config: &subnet_core::Config) -> Result<BootstrappedServices> {
    bootstrap_services(config).context("Failed to bootstrap services")
}

async fn track_and_poll(coordinator: &Coordinator, address: &str) -> Result<()> {
    coordinator
        .track(address)
        .with_context(|| format!("Cannot track {address}"))?;
    coordinator.repoll(address).await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs the poll loop and prints events until a shutdown signal.
async fn watch(services: &BootstrappedServices, addresses: &[String], snapshots: bool) -> Result<()> {
    let coordinator = &services.coordinator;
    for address in addresses {
        if let Err(e) = coordinator.track(address) {
            log::warn!("Skipping {}: {}", address, e);
        }
    }
    if coordinator.tracked().is_empty() {
        return Err(anyhow!(
            "No speakers to watch; pass --speaker or set speaker_ips / SUBNET_SPEAKER_IPS"
        ));
    }

    let mut events = services.event_bridge.subscribe();
    services.start();
    log::info!("Watching {} speaker(s)", coordinator.tracked().len());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if snapshots && matches!(event, subnet_core::BroadcastEvent::Cycle(_)) {
                        let mut all: Vec<_> = coordinator.all_snapshots().into_iter().collect();
                        all.sort_by(|a, b| a.0.cmp(&b.0));
                        for (address, snapshot) in all {
                            println!(
                                "{}",
                                serde_json::to_string(&serde_json::json!({
                                    "address": address,
                                    "snapshot": snapshot,
                                }))?
                            );
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Event output fell behind; {} event(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    services.shutdown();
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
