//! Core abstractions shared across tvbridge.
//!
//! This crate defines the change-notification bus the registry publishes
//! on and the configuration defaults the other crates read.

pub mod changebus;
pub mod config;

pub use changebus::{ChangeBus, ChangeListener, DEFAULT_CHANNEL_CAPACITY};
