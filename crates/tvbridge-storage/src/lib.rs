//! Persistent storage for the tvbridge device history.

pub mod device_store;
pub mod error;

pub use device_store::{DeviceRecord, DeviceStore, SCHEMA_VERSION};
pub use error::{Error, Result};
