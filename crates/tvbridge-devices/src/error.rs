//! Device-layer error types.

use thiserror::Error;

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Device error types.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Registry used before a storage backend was bound. This is a
    /// startup-ordering bug in the caller, not a runtime condition.
    #[error("device registry not initialized: bind a storage backend first")]
    NotInitialized,

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] tvbridge_storage::Error),

    /// Bridge daemon invocation failure.
    #[error("bridge error: {0}")]
    Bridge(#[from] crate::bridge::BridgeError),

    /// A connect attempt that did not end with a connected device.
    #[error("connection to {address} failed: {detail}. Try restarting the bridge server")]
    ConnectFailed { address: String, detail: String },
}
