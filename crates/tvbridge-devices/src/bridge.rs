//! Bridge daemon invocation.
//!
//! Every daemon verb goes through [`BridgeTransport`], so connection flows
//! can be driven against a scripted transport in tests. The real
//! transport, [`BridgeClient`], spawns the daemon binary and captures its
//! output. There is deliberately no timeout here: a hung daemon call hangs
//! that one invocation.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

use tvbridge_core::config;

/// Bridge invocation errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The daemon binary could not be spawned at all.
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    /// The daemon ran but exited unsuccessfully.
    #[error("{verb} exited with {status}: {output}")]
    CommandFailed {
        verb: String,
        status: std::process::ExitStatus,
        output: String,
    },
}

/// One verb against the bridge daemon.
///
/// `run` is the only required method; the verb helpers are defined on the
/// trait so test doubles script a single entry point.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    /// Run one daemon verb and return its combined stdout/stderr.
    async fn run(&self, args: &[&str]) -> Result<String, BridgeError>;

    /// Device-listing verb.
    async fn devices(&self) -> Result<String, BridgeError> {
        self.run(&["devices"]).await
    }

    /// Connect to `address[:port]`.
    async fn connect(&self, address: &str) -> Result<String, BridgeError> {
        self.run(&["connect", address]).await
    }

    /// Disconnect `address`.
    async fn disconnect(&self, address: &str) -> Result<String, BridgeError> {
        self.run(&["disconnect", address]).await
    }

    /// Start the daemon's resident server.
    async fn start_server(&self) -> Result<String, BridgeError> {
        self.run(&["start-server"]).await
    }

    /// Stop the daemon's resident server.
    async fn kill_server(&self) -> Result<String, BridgeError> {
        self.run(&["kill-server"]).await
    }
}

/// Process-backed transport invoking the real daemon binary.
pub struct BridgeClient {
    bin: String,
}

impl BridgeClient {
    /// Transport for a specific daemon binary (name or path).
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Transport for the binary named by the environment, or the default.
    pub fn from_env() -> Self {
        Self::new(config::env_vars::bridge_bin())
    }

    /// The configured daemon binary.
    pub fn bin(&self) -> &str {
        &self.bin
    }
}

#[async_trait]
impl BridgeTransport for BridgeClient {
    async fn run(&self, args: &[&str]) -> Result<String, BridgeError> {
        debug!(bin = %self.bin, ?args, "running bridge command");

        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|source| BridgeError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            error!(bin = %self.bin, ?args, stderr = %stderr.trim(), "bridge command stderr");
        }

        let mut combined = stdout.into_owned();
        combined.push_str(&stderr);

        if !output.status.success() {
            return Err(BridgeError::CommandFailed {
                verb: args.first().copied().unwrap_or_default().to_string(),
                status: output.status,
                output: combined,
            });
        }

        Ok(combined)
    }
}
