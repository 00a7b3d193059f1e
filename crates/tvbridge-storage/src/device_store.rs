//! Device history storage using redb.
//!
//! The entire history lives under a single table entry as an ordered JSON
//! list, so the on-disk order is the insertion order callers see. The
//! registry writes through after every mutation; there is no batching.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, Utc};
use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

// History table: single entry, key = HISTORY_KEY, value = envelope (JSON)
const HISTORY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("device_history");
const HISTORY_KEY: &str = "devices";

/// Current version of the persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// One known device, keyed by its network address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Network address (port stripped). Unique key within the history.
    pub address: String,
    /// User-assigned label; absent until the device is named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Raw model identifier reported by the daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Platform version derived from the model; never user-edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    /// Last time the device was confirmed connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Current known live-connection state.
    #[serde(default)]
    pub is_connected: bool,
}

impl DeviceRecord {
    /// Create a bare record for an address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            model: None,
            platform_version: None,
            last_connected_at: None,
            is_connected: false,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the derived platform version.
    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = Some(version.into());
        self
    }
}

/// Persisted envelope. The version tag gives a future field change a
/// migration anchor.
#[derive(Debug, Serialize, Deserialize)]
struct VersionedHistory {
    #[serde(default)]
    schema_version: u32,
    devices: Vec<DeviceRecord>,
}

/// Device history store backed by redb.
pub struct DeviceStore {
    db: Arc<Database>,
    path: String,
}

/// Global store singletons (thread-safe), keyed by path.
static STORE_SINGLETONS: StdMutex<Vec<Arc<DeviceStore>>> = StdMutex::new(Vec::new());

impl DeviceStore {
    /// Open or create a device store at the given path.
    /// Uses a singleton pattern to prevent multiple opens of the same database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        // The lock is held across creation so a concurrent open of the same
        // path cannot race the database file.
        let mut singletons = STORE_SINGLETONS.lock().unwrap();
        if let Some(store) = singletons.iter().find(|store| store.path == path_str) {
            return Ok(store.clone());
        }

        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if path_ref.exists() {
            Database::open(path_ref)?
        } else {
            Database::create(path_ref)?
        };

        // Opening the table inside a write transaction creates it when the
        // database is fresh or the file predates the table.
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(HISTORY_TABLE)?;
        }
        write_txn.commit()?;

        let store = Arc::new(DeviceStore {
            db: Arc::new(db),
            path: path_str,
        });

        singletons.push(store.clone());
        Ok(store)
    }

    /// Load the full device list, in stored order.
    ///
    /// A missing entry is an empty history. An envelope with a schema
    /// version this build does not understand loads as an empty history
    /// with a warning rather than failing startup.
    pub fn load(&self) -> Result<Vec<DeviceRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;

        match table.get(HISTORY_KEY)? {
            Some(value) => {
                let envelope: VersionedHistory = serde_json::from_str(value.value())?;
                if envelope.schema_version != SCHEMA_VERSION {
                    warn!(
                        found = envelope.schema_version,
                        expected = SCHEMA_VERSION,
                        "unrecognized device history schema version, starting empty"
                    );
                    return Ok(Vec::new());
                }
                Ok(envelope.devices)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace the stored device list.
    pub fn save(&self, devices: &[DeviceRecord]) -> Result<()> {
        let envelope = VersionedHistory {
            schema_version: SCHEMA_VERSION,
            devices: devices.to_vec(),
        };
        self.save_json(&serde_json::to_string(&envelope)?)
    }

    fn save_json(&self, json: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            table.insert(HISTORY_KEY, json)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Path this store was opened at.
    pub fn path(&self) -> &str {
        &self.path
    }
}
