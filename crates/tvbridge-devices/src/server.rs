//! Bridge server health: probing, lifecycle verbs, and periodic polling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tvbridge_core::config;

use crate::bridge::{BridgeError, BridgeTransport};

/// Last known server state, as presentation layers show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Running,
    Stopped,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Unknown => write!(f, "checking"),
            ServerStatus::Running => write!(f, "running"),
            ServerStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Health prober and lifecycle driver for the bridge server.
#[derive(Clone)]
pub struct ServerProber {
    transport: Arc<dyn BridgeTransport>,
    process_name: String,
}

impl ServerProber {
    /// Prober for a server whose process is named `process_name`.
    pub fn new(transport: Arc<dyn BridgeTransport>, process_name: impl Into<String>) -> Self {
        Self {
            transport,
            process_name: process_name.into(),
        }
    }

    /// Check whether the server process exists.
    ///
    /// Absence of evidence is treated as not running: any inspection
    /// failure yields `false`, so dependent flows fall back to starting
    /// the server rather than skipping it.
    pub async fn is_running(&self) -> bool {
        let name = self.process_name.clone();
        tokio::task::spawn_blocking(move || scan_process_list(&name))
            .await
            .unwrap_or(false)
    }

    /// Probe once and report the result as a status value.
    pub async fn probe(&self) -> ServerStatus {
        if self.is_running().await {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        }
    }

    /// Start the server. Failures propagate; starting is an explicit
    /// action, not a passive check.
    pub async fn start(&self) -> Result<String, BridgeError> {
        self.transport.start_server().await
    }

    /// Stop the server.
    pub async fn stop(&self) -> Result<String, BridgeError> {
        self.transport.kill_server().await
    }

    /// Stop then start. "Already stopped" is not a reason to skip the
    /// start, so the stop result is only logged.
    pub async fn restart(&self) -> Result<String, BridgeError> {
        if let Err(err) = self.stop().await {
            warn!(%err, "stop before restart failed, starting anyway");
        }
        self.start().await
    }
}

/// Blocking process-list scan; callers go through `spawn_blocking`.
///
/// The server shows up as the daemon binary running its fork-server
/// argument (on Windows the image name alone identifies it).
fn scan_process_list(bridge_bin: &str) -> bool {
    // The configured binary may be a full path; processes report the
    // image name only.
    let target = std::path::Path::new(bridge_bin)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(bridge_bin);

    let system = System::new_all();
    system.processes().values().any(|process| {
        let name_matches = process
            .name()
            .to_str()
            .map(|name| name == target || name.strip_suffix(".exe") == Some(target))
            .unwrap_or(false);
        if !name_matches {
            return false;
        }
        cfg!(windows)
            || process
                .cmd()
                .iter()
                .any(|arg| arg.to_str() == Some(config::bridge::SERVER_PROCESS_ARG))
    })
}

/// Repeating health poll.
///
/// Probes on a fixed interval and publishes the last known status into a
/// watch channel; the value is overwritten, never merged. `shutdown` stops
/// future ticks only: an in-flight probe completes and publishes a result
/// nobody acts on.
pub struct StatusPoller {
    cancel: CancellationToken,
    rx: watch::Receiver<ServerStatus>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Spawn the poll task with the given period.
    pub fn spawn(prober: ServerProber, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(ServerStatus::Unknown);

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = prober.probe().await;
                        debug!(%status, "server poll");
                        let _ = tx.send(status);
                    }
                }
            }
        });

        Self { cancel, rx, handle }
    }

    /// Last published status.
    pub fn status(&self) -> ServerStatus {
        *self.rx.borrow()
    }

    /// Watch the status value as it changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.rx.clone()
    }

    /// Stop future polls. In-flight work is not aborted.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poll task to wind down after `shutdown`.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
