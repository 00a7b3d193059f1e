//! Device service: the command surface presentation layers call.
//!
//! Wires the registry, bridge transport, server prober, and connector
//! into one facade so consumers hold a single handle.

use std::sync::Arc;

use tvbridge_core::ChangeListener;
use tvbridge_storage::device_store::DeviceRecord;

use crate::bridge::BridgeTransport;
use crate::connector::{DeviceConnector, NamePrompt};
use crate::error::Result;
use crate::parser::DiscoveredDevice;
use crate::registry::DeviceRegistry;
use crate::server::{ServerProber, ServerStatus};

/// High-level device operations.
pub struct DeviceService {
    registry: Arc<DeviceRegistry>,
    connector: DeviceConnector,
    prober: ServerProber,
}

impl DeviceService {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        transport: Arc<dyn BridgeTransport>,
        prober: ServerProber,
        prompt: Arc<dyn NamePrompt>,
    ) -> Self {
        let connector =
            DeviceConnector::new(registry.clone(), transport, prober.clone(), prompt);
        Self {
            registry,
            connector,
            prober,
        }
    }

    /// Known devices, insertion order.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        self.registry.list().await
    }

    /// Connect to a device and record the outcome.
    pub async fn connect(&self, target: &str) -> Result<DeviceRecord> {
        self.connector.connect(target).await
    }

    /// Disconnect a device.
    pub async fn disconnect(&self, target: &str) -> Result<()> {
        self.connector.disconnect(target).await
    }

    /// Rename a known device.
    pub async fn rename(&self, address: &str, name: &str) -> Result<()> {
        self.registry.rename(address, name).await
    }

    /// Remove a device from the history.
    pub async fn remove(&self, address: &str) -> Result<()> {
        self.registry.remove(address).await
    }

    /// Clear the whole history.
    pub async fn clear(&self) -> Result<()> {
        self.registry.clear().await
    }

    /// Query the daemon for currently attached devices.
    pub async fn discover(&self) -> Vec<DiscoveredDevice> {
        self.connector.discover().await
    }

    /// Probe the bridge server once.
    pub async fn refresh_server_status(&self) -> ServerStatus {
        self.prober.probe().await
    }

    /// Subscribe to registry change notifications.
    pub fn subscribe_changes(&self) -> ChangeListener {
        self.registry.subscribe()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// The underlying server prober.
    pub fn prober(&self) -> &ServerProber {
        &self.prober
    }
}
