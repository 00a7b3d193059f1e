//! Device discovery, registry, and connection lifecycle for tvbridge.
//!
//! The bridge daemon is the only source of truth about attached devices;
//! everything here either talks to it ([`bridge`], [`server`]), interprets
//! its output ([`parser`], [`version`]), or keeps the persisted picture of
//! what it has said so far ([`registry`], [`connector`], [`service`]).

pub mod bridge;
pub mod connector;
pub mod error;
pub mod inspector;
pub mod namegen;
pub mod parser;
pub mod registry;
pub mod server;
pub mod service;
pub mod version;

pub use bridge::{BridgeClient, BridgeError, BridgeTransport};
pub use connector::{DeviceConnector, GeneratedNamePrompt, NamePrompt};
pub use error::{DeviceError, Result};
pub use parser::{DiscoveredDevice, parse_device_listing};
pub use registry::DeviceRegistry;
pub use server::{ServerProber, ServerStatus, StatusPoller};
pub use service::DeviceService;
pub use version::infer_version;

// The registry persists and returns this type directly.
pub use tvbridge_storage::device_store::DeviceRecord;
