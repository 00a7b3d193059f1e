//! Connection orchestration.
//!
//! A connect attempt walks daemon precondition → connect verb → result
//! classification → registry update. Failures stop before the registry is
//! touched, so a failed attempt never perturbs the persisted history.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use tvbridge_core::config;
use tvbridge_storage::device_store::DeviceRecord;

use crate::bridge::BridgeTransport;
use crate::error::{DeviceError, Result};
use crate::namegen;
use crate::parser::{DiscoveredDevice, parse_device_listing};
use crate::registry::DeviceRegistry;
use crate::server::ServerProber;

/// Collaborator that asks the user to name a newly connected device.
///
/// `suggested` is a generated fallback; returning `None` accepts it.
#[async_trait]
pub trait NamePrompt: Send + Sync {
    async fn prompt_name(&self, suggested: &str) -> Option<String>;
}

/// Prompt that always accepts the generated suggestion. Used where no
/// interactive surface exists.
pub struct GeneratedNamePrompt;

#[async_trait]
impl NamePrompt for GeneratedNamePrompt {
    async fn prompt_name(&self, _suggested: &str) -> Option<String> {
        None
    }
}

/// Drives connect and disconnect attempts end to end.
pub struct DeviceConnector {
    registry: Arc<DeviceRegistry>,
    transport: Arc<dyn BridgeTransport>,
    prober: ServerProber,
    prompt: Arc<dyn NamePrompt>,
}

impl DeviceConnector {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        transport: Arc<dyn BridgeTransport>,
        prober: ServerProber,
        prompt: Arc<dyn NamePrompt>,
    ) -> Self {
        Self {
            registry,
            transport,
            prober,
            prompt,
        }
    }

    /// Connect to `target` (`address[:port]`).
    ///
    /// On success the registry holds exactly one connected record for the
    /// address; on failure the registry is untouched and the error carries
    /// a remediation hint.
    pub async fn connect(&self, target: &str) -> Result<DeviceRecord> {
        // The daemon must be up first. Failure to start it is not fatal:
        // some daemons auto-start on the first verb.
        if !self.prober.is_running().await {
            info!("bridge server not running, starting it");
            if let Err(err) = self.prober.start().await {
                warn!(%err, "could not start bridge server, attempting connect anyway");
            }
        }

        let output = match self.transport.connect(target).await {
            Ok(output) => output,
            Err(err) => {
                return Err(DeviceError::ConnectFailed {
                    address: target.to_string(),
                    detail: err.to_string(),
                });
            }
        };

        if !output.contains(config::bridge::CONNECT_MARKER) {
            return Err(DeviceError::ConnectFailed {
                address: target.to_string(),
                detail: output.trim().to_string(),
            });
        }

        let address = strip_port(target);

        if self.registry.contains(&address).await? {
            // Re-confirm the known device without touching its name
            self.registry
                .upsert(DeviceRecord::new(address.clone()))
                .await?;
        } else {
            // The daemon is the only source of truth for the model, and
            // the model drives the derived platform version, so discover
            // rather than synthesize a record from the typed address.
            let mut record = DeviceRecord::new(address.clone());
            if let Some(found) = self
                .discover()
                .await
                .into_iter()
                .find(|device| device.address == address)
            {
                record = record
                    .with_model(found.model)
                    .with_platform_version(found.platform_version);
            }

            let suggested = namegen::generate();
            let name = self
                .prompt
                .prompt_name(&suggested)
                .await
                .unwrap_or(suggested);
            record = record.with_display_name(name);

            self.registry.upsert(record).await?;
        }

        self.registry.set_connection_status(&address, true).await?;
        info!(%address, "device connected");

        self.registry
            .get(&address)
            .await?
            .ok_or_else(|| DeviceError::ConnectFailed {
                address: address.clone(),
                detail: "record vanished after connect".to_string(),
            })
    }

    /// Disconnect `target`. The daemon verb is fire-and-forget: its result
    /// is logged, not classified. The registry still flips the device to
    /// disconnected.
    pub async fn disconnect(&self, target: &str) -> Result<()> {
        if let Err(err) = self.transport.disconnect(target).await {
            warn!(%err, "disconnect verb failed");
        }
        self.registry
            .set_connection_status(&strip_port(target), false)
            .await
    }

    /// Run one discovery pass. Daemon errors degrade to an empty list,
    /// never an error.
    pub async fn discover(&self) -> Vec<DiscoveredDevice> {
        match self.transport.devices().await {
            Ok(output) => parse_device_listing(&output),
            Err(err) => {
                warn!(%err, "device discovery failed");
                Vec::new()
            }
        }
    }
}

/// Registry keys are bare addresses; the daemon accepts `address[:port]`.
fn strip_port(target: &str) -> String {
    target
        .split(':')
        .next()
        .unwrap_or(target)
        .to_string()
}
