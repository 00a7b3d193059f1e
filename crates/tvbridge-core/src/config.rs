//! Configuration defaults and environment overrides.
//!
//! All tunables live here so the crates don't each grow their own copies
//! of the same constants.

/// Bridge daemon defaults.
pub mod bridge {
    /// Bridge daemon binary invoked for every verb.
    pub const DEFAULT_BIN: &str = "sdb";
    /// Device-side port assumed when the user types a bare address.
    pub const DEFAULT_PORT: u16 = 26101;
    /// Substring in the connect verb's output that signals success.
    pub const CONNECT_MARKER: &str = "connected";
    /// Argument the daemon's resident server process runs under.
    pub const SERVER_PROCESS_ARG: &str = "fork-server";
}

/// Persistent storage defaults.
pub mod storage {
    /// Directory holding the device history database.
    pub const DEFAULT_DATA_DIR: &str = "./data";
    /// Database file name inside the data directory.
    pub const DB_FILE: &str = "devices.redb";
}

/// Server health-poll defaults.
pub mod poll {
    /// Seconds between health probes.
    pub const DEFAULT_INTERVAL_SECS: u64 = 10;
}

/// Environment variable names and their fallback helpers.
pub mod env_vars {
    use std::path::PathBuf;
    use std::time::Duration;

    pub const BRIDGE_BIN: &str = "TVBRIDGE_BIN";
    pub const DATA_DIR: &str = "TVBRIDGE_DATA_DIR";
    pub const POLL_INTERVAL_SECS: &str = "TVBRIDGE_POLL_SECS";

    /// Bridge binary from the environment, or the default.
    pub fn bridge_bin() -> String {
        std::env::var(BRIDGE_BIN).unwrap_or_else(|_| super::bridge::DEFAULT_BIN.to_string())
    }

    /// Data directory from the environment, or the default.
    pub fn data_dir() -> PathBuf {
        std::env::var(DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(super::storage::DEFAULT_DATA_DIR))
    }

    /// Health-poll interval from the environment, or the default.
    /// Unparseable values fall back to the default.
    pub fn poll_interval() -> Duration {
        let secs = std::env::var(POLL_INTERVAL_SECS)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(super::poll::DEFAULT_INTERVAL_SECS);
        Duration::from_secs(secs)
    }
}
