//! DevTools inspector URL for a connected device's web runtime.
//!
//! A debug-enabled device exposes the remote-debugging JSON endpoint; the
//! first listed page carries the WebSocket debugger URL the inspector page
//! is derived from.

use serde::Deserialize;
use thiserror::Error;

/// Inspector lookup errors.
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no debugging targets on {0}")]
    NoTargets(String),

    #[error("debug target carries no webSocketDebuggerUrl")]
    MissingDebuggerUrl,
}

#[derive(Debug, Deserialize)]
struct DebugTarget {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

/// Build the DevTools inspector URL for the debug port at `ip:port`.
pub async fn inspector_url(ip: &str, port: u16) -> Result<String, InspectorError> {
    let endpoint = format!("http://{ip}:{port}/json/list");
    let targets: Vec<DebugTarget> = reqwest::get(&endpoint).await?.json().await?;

    let first = targets
        .into_iter()
        .next()
        .ok_or_else(|| InspectorError::NoTargets(format!("{ip}:{port}")))?;
    let ws_url = first
        .web_socket_debugger_url
        .ok_or(InspectorError::MissingDebuggerUrl)?;

    Ok(format!(
        "http://{ip}:{port}/devtools/inspector.html?ws={ip}:{port}/devtools/page/{}",
        page_id(&ws_url)
    ))
}

/// The page id is the last path segment of the WebSocket debugger URL.
fn page_id(ws_url: &str) -> &str {
    ws_url.rsplit('/').next().unwrap_or_default()
}
