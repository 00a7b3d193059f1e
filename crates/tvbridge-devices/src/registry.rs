//! The device registry: the authoritative, persisted list of known devices.
//!
//! Exactly one record exists per address, insertion order is preserved,
//! and every mutation is written through to the bound store before the
//! change notification fires. Operations on addresses the registry does
//! not know are silent no-ops; only using the registry before a store is
//! bound is an error.
//!
//! ```rust,no_run
//! use tvbridge_devices::DeviceRegistry;
//!
//! # async fn open() -> tvbridge_devices::Result<()> {
//! let registry = DeviceRegistry::with_persistence("./data/devices.redb").await?;
//! let devices = registry.list().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use tvbridge_core::{ChangeBus, ChangeListener};
use tvbridge_storage::device_store::{DeviceRecord, DeviceStore};

use crate::error::{DeviceError, Result};
use crate::version::infer_version;

/// Authoritative device list, keyed by address.
pub struct DeviceRegistry {
    /// Known devices, insertion order preserved.
    devices: RwLock<Vec<DeviceRecord>>,
    /// Write-through storage backend; `None` until bound.
    storage: RwLock<Option<Arc<DeviceStore>>>,
    /// Fired once after each durable mutation.
    changes: ChangeBus,
}

impl DeviceRegistry {
    /// Create an unbound registry. Every operation fails with
    /// [`DeviceError::NotInitialized`] until [`Self::bind`] is called.
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            storage: RwLock::new(None),
            changes: ChangeBus::new(),
        }
    }

    /// Open the store at `path`, load the persisted history, and return a
    /// bound registry.
    pub async fn with_persistence<P: AsRef<Path>>(path: P) -> Result<Self> {
        let registry = Self::new();
        registry.bind(DeviceStore::open(path)?).await?;
        Ok(registry)
    }

    /// Bind the storage backend and load the persisted history into memory.
    pub async fn bind(&self, store: Arc<DeviceStore>) -> Result<()> {
        let loaded = store.load()?;
        info!(count = loaded.len(), path = store.path(), "loaded device history");
        *self.devices.write().await = loaded;
        *self.storage.write().await = Some(store);
        Ok(())
    }

    /// Handle to the change-notification bus.
    pub fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> ChangeListener {
        self.changes.subscribe()
    }

    async fn store(&self) -> Result<Arc<DeviceStore>> {
        self.storage
            .read()
            .await
            .clone()
            .ok_or(DeviceError::NotInitialized)
    }

    /// Current device list, in insertion order.
    pub async fn list(&self) -> Result<Vec<DeviceRecord>> {
        self.store().await?;
        Ok(self.devices.read().await.clone())
    }

    /// Look up one device by address.
    pub async fn get(&self, address: &str) -> Result<Option<DeviceRecord>> {
        self.store().await?;
        Ok(self
            .devices
            .read()
            .await
            .iter()
            .find(|device| device.address == address)
            .cloned())
    }

    /// Whether the address is known.
    pub async fn contains(&self, address: &str) -> Result<bool> {
        Ok(self.get(address).await?.is_some())
    }

    /// Insert or merge a record, keyed by address.
    ///
    /// On merge, incoming `Some` fields overwrite and incoming `None`
    /// fields leave stored data alone; the platform version is re-derived
    /// whenever the model changes. `last_connected_at` is always refreshed.
    /// Returns `true` when the address was new. Notifies once, after the
    /// durable write.
    pub async fn upsert(&self, incoming: DeviceRecord) -> Result<bool> {
        let store = self.store().await?;
        let mut devices = self.devices.write().await;
        let now = Utc::now();

        let position = devices
            .iter()
            .position(|device| device.address == incoming.address);

        let inserted = match position {
            Some(index) => {
                let existing = &mut devices[index];
                if let Some(name) = incoming.display_name {
                    existing.display_name = Some(name);
                }
                if let Some(model) = incoming.model {
                    if existing.model.as_deref() != Some(model.as_str()) {
                        existing.platform_version = Some(infer_version(&model).to_string());
                    }
                    existing.model = Some(model);
                }
                existing.last_connected_at = Some(now);
                false
            }
            None => {
                let mut record = incoming;
                if record.platform_version.is_none() {
                    if let Some(model) = &record.model {
                        record.platform_version = Some(infer_version(model).to_string());
                    }
                }
                record.last_connected_at = Some(now);
                devices.push(record);
                true
            }
        };

        store.save(&devices)?;
        drop(devices);
        self.changes.notify();
        debug!(inserted, "device upserted");
        Ok(inserted)
    }

    /// Remove a device. Unknown addresses are a no-op with no notification.
    pub async fn remove(&self, address: &str) -> Result<()> {
        let store = self.store().await?;
        let mut devices = self.devices.write().await;

        let before = devices.len();
        devices.retain(|device| device.address != address);
        if devices.len() == before {
            return Ok(());
        }

        store.save(&devices)?;
        drop(devices);
        self.changes.notify();
        info!(%address, "device removed from history");
        Ok(())
    }

    /// Empty the registry. Always notifies, even when already empty, so
    /// callers can use it as a forced refresh.
    pub async fn clear(&self) -> Result<()> {
        let store = self.store().await?;
        let mut devices = self.devices.write().await;

        devices.clear();
        store.save(&devices)?;
        drop(devices);
        self.changes.notify();
        info!("device history cleared");
        Ok(())
    }

    /// Set the display name. Unknown addresses are a no-op with no
    /// notification.
    pub async fn rename(&self, address: &str, name: impl Into<String>) -> Result<()> {
        let store = self.store().await?;
        let mut devices = self.devices.write().await;

        let Some(device) = devices.iter_mut().find(|device| device.address == address) else {
            return Ok(());
        };
        device.display_name = Some(name.into());

        store.save(&devices)?;
        drop(devices);
        self.changes.notify();
        Ok(())
    }

    /// Update the live-connection state. A transition to connected also
    /// refreshes `last_connected_at`. Unknown addresses are a no-op with
    /// no notification.
    pub async fn set_connection_status(&self, address: &str, connected: bool) -> Result<()> {
        let store = self.store().await?;
        let mut devices = self.devices.write().await;

        let Some(device) = devices.iter_mut().find(|device| device.address == address) else {
            return Ok(());
        };
        device.is_connected = connected;
        if connected {
            device.last_connected_at = Some(Utc::now());
        }

        store.save(&devices)?;
        drop(devices);
        self.changes.notify();
        Ok(())
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
