//! Concrete network client.
//!
//! [`SonosClientImpl`] is the production implementation of the
//! [`SonosControl`] and [`DescriptorSource`] seams. One instance (and one
//! pooled `reqwest::Client`) is shared by the scanner, the poller and every
//! command.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;

use crate::error::{SubnetError, SubnetResult};
use crate::sonos::descriptor;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{send_soap_request, SoapError, SoapResult};
use crate::sonos::traits::{DescriptorSource, SonosControl};
use crate::sonos::types::DeviceRecord;
use crate::state::Config;

/// Builds the shared HTTP client.
///
/// # Errors
/// Returns [`SubnetError::Internal`] if the TLS backend or resolver cannot
/// be initialized.
pub fn build_http_client(config: &Config) -> SubnetResult<Client> {
    Client::builder()
        .timeout(config.soap_timeout())
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| SubnetError::Internal(format!("failed to create HTTP client: {}", e)))
}

/// Production Sonos client.
///
/// SOAP calls are gated by a semaphore sized from
/// `Config::max_concurrent_requests`, which caps the poll fan-out across
/// all devices. Descriptor probes bypass it; the scanner bounds those with
/// its batch size.
#[derive(Clone)]
pub struct SonosClientImpl {
    /// HTTP client for Sonos communication.
    client: Client,
    port: u16,
    soap_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for SonosClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonosClientImpl")
            .field("client", &"Client")
            .field("port", &self.port)
            .field("soap_timeout", &self.soap_timeout)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl SonosClientImpl {
    /// Creates a client over an existing HTTP client.
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            port: config.port,
            soap_timeout: config.soap_timeout(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
        }
    }

    /// Creates a client with its own HTTP client.
    ///
    /// # Errors
    /// See [`build_http_client`].
    pub fn from_config(config: &Config) -> SubnetResult<Self> {
        Ok(Self::new(build_http_client(config)?, config))
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl SonosControl for SonosClientImpl {
    async fn call(
        &self,
        ip: &str,
        service: SonosService,
        action: &str,
        arguments: &str,
    ) -> SoapResult<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SoapError::Transport("request limiter closed".into()))?;

        send_soap_request(
            &self.client,
            ip,
            self.port,
            service,
            action,
            arguments,
            self.soap_timeout,
        )
        .await
    }
}

#[async_trait]
impl DescriptorSource for SonosClientImpl {
    async fn fetch_descriptor(&self, ip: &str, timeout: Duration) -> Option<DeviceRecord> {
        descriptor::fetch_descriptor(&self.client, ip, self.port, timeout).await
    }
}
