//! Parser for the daemon's device-listing output.

use serde::{Deserialize, Serialize};

use crate::version::infer_version;

/// One device reported by the daemon's listing verb.
///
/// Ephemeral: a discovered device only enters the persisted history
/// through the registry's merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Device address, port stripped.
    pub address: String,
    /// Model identifier, uppercased.
    pub model: String,
    /// Platform version inferred from the model.
    pub platform_version: String,
}

/// Parse the raw listing output into device descriptors.
///
/// A line describes a device only if it has at least three
/// whitespace-separated fields: `address[:port] <state> <model>`. Shorter
/// lines are daemon banner/header noise and are skipped. Malformed input
/// degrades to fewer (or no) devices; this never fails.
pub fn parse_device_listing(output: &str) -> Vec<DiscoveredDevice> {
    let mut devices = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        // First field carries "address:port"; only the address is kept
        let address = match parts[0].split(':').next() {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => continue,
        };

        let model = parts[2].to_uppercase();
        let platform_version = infer_version(&model).to_string();

        devices.push(DiscoveredDevice {
            address,
            model,
            platform_version,
        });
    }

    devices
}
