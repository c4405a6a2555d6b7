//! Composition root.
//!
//! The single place where the client, event bridge and coordinator are
//! created and wired together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{SubnetError, SubnetResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::runtime::TokioSpawner;
use crate::services::Coordinator;
use crate::sonos::{SonosClient, SonosClientImpl};
use crate::state::Config;

/// Container for the wired services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Network client shared by every request.
    pub sonos: Arc<dyn SonosClient>,
    /// Owns tracked speakers and their snapshots.
    pub coordinator: Arc<Coordinator>,
    /// Broadcast channel subscribers read coordinator events from.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Runs the poll loop and each poll cycle.
    pub spawner: TokioSpawner,
    /// Stops the poll loop.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the poll loop.
    pub fn start(&self) {
        self.coordinator.spawn(self.cancel_token.clone());
    }

    /// Stops background work. In-flight polls finish on their own.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Shutting down");
        self.cancel_token.cancel();
    }
}

/// Wires every service from `config` with the real HTTP client.
///
/// Must be called inside a Tokio runtime.
///
/// # Errors
/// [`SubnetError::Configuration`] for invalid settings,
/// [`SubnetError::Internal`] if the HTTP client cannot be built.
pub fn bootstrap_services(config: &Config) -> SubnetResult<BootstrappedServices> {
    config.validate().map_err(SubnetError::Configuration)?;
    let sonos = Arc::new(SonosClientImpl::from_config(config)?);
    bootstrap_services_with_client(config, sonos)
}

/// Wires every service around an existing client.
///
/// # Errors
/// [`SubnetError::Configuration`] for invalid settings.
pub fn bootstrap_services_with_client(
    config: &Config,
    sonos: Arc<dyn SonosClient>,
) -> SubnetResult<BootstrappedServices> {
    config.validate().map_err(SubnetError::Configuration)?;

    let spawner = TokioSpawner::current();
    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));

    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&sonos),
        config.clone(),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
    ));

    Ok(BootstrappedServices {
        sonos,
        coordinator,
        event_bridge,
        spawner,
        cancel_token: CancellationToken::new(),
    })
}
