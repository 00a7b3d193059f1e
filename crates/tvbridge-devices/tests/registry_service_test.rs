//! Tests for DeviceRegistry and the connection flows.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::test;

use tvbridge_devices::bridge::{BridgeError, BridgeTransport};
use tvbridge_devices::{
    DeviceConnector, DeviceError, DeviceRecord, DeviceRegistry, DeviceService,
    GeneratedNamePrompt, NamePrompt, ServerProber, ServerStatus, StatusPoller,
};

/// Transport double answering each verb from a fixed script.
struct ScriptedBridge {
    connect_output: Result<String, String>,
    devices_output: String,
    kill_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBridge {
    fn new(connect_output: Result<&str, &str>, devices_output: &str) -> Self {
        Self {
            connect_output: connect_output
                .map(str::to_string)
                .map_err(str::to_string),
            devices_output: devices_output.to_string(),
            kill_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    fn spawn_error(message: &str) -> BridgeError {
        BridgeError::Spawn {
            bin: "sdb".to_string(),
            source: std::io::Error::other(message.to_string()),
        }
    }
}

#[async_trait]
impl BridgeTransport for ScriptedBridge {
    async fn run(&self, args: &[&str]) -> Result<String, BridgeError> {
        self.calls.lock().await.push(args.join(" "));
        match args.first().copied().unwrap_or_default() {
            "connect" => self
                .connect_output
                .clone()
                .map_err(|message| Self::spawn_error(&message)),
            "devices" => Ok(self.devices_output.clone()),
            "kill-server" if self.kill_fails => Err(Self::spawn_error("kill failed")),
            _ => Ok(String::new()),
        }
    }
}

/// Prompt double returning a fixed name.
struct FixedNamePrompt(&'static str);

#[async_trait]
impl NamePrompt for FixedNamePrompt {
    async fn prompt_name(&self, _suggested: &str) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn temp_registry_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("devices.redb")
}

async fn bound_registry(dir: &tempfile::TempDir) -> Arc<DeviceRegistry> {
    Arc::new(
        DeviceRegistry::with_persistence(temp_registry_path(dir))
            .await
            .unwrap(),
    )
}

fn connector(
    registry: Arc<DeviceRegistry>,
    bridge: Arc<ScriptedBridge>,
    prompt: Arc<dyn NamePrompt>,
) -> DeviceConnector {
    // A process name no real machine runs, so the probe reports stopped
    // and the start path is exercised deterministically.
    let prober = ServerProber::new(bridge.clone(), "tvbridge-test-no-such-daemon");
    DeviceConnector::new(registry, bridge, prober, prompt)
}

#[test]
async fn unbound_registry_rejects_every_operation() {
    let registry = DeviceRegistry::new();

    assert!(matches!(
        registry.list().await,
        Err(DeviceError::NotInitialized)
    ));
    assert!(matches!(
        registry.upsert(DeviceRecord::new("10.0.0.1")).await,
        Err(DeviceError::NotInitialized)
    ));
    assert!(matches!(
        registry.clear().await,
        Err(DeviceError::NotInitialized)
    ));
}

#[test]
async fn upsert_keeps_one_record_per_address() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    let inserted = registry
        .upsert(DeviceRecord::new("192.168.0.10").with_model("UE43TU7022KXXH"))
        .await
        .unwrap();
    assert!(inserted);

    let updated = registry
        .upsert(DeviceRecord::new("192.168.0.10").with_display_name("Living Room"))
        .await
        .unwrap();
    assert!(!updated);

    registry
        .upsert(DeviceRecord::new("192.168.0.20"))
        .await
        .unwrap();

    let devices = registry.list().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].address, "192.168.0.10");
    assert_eq!(devices[1].address, "192.168.0.20");
}

#[test]
async fn merge_does_not_erase_absent_fields() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(
            DeviceRecord::new("192.168.0.10")
                .with_display_name("Living Room")
                .with_model("UE43TU7022KXXH"),
        )
        .await
        .unwrap();

    // Incoming record carries no model and no name
    registry
        .upsert(DeviceRecord::new("192.168.0.10"))
        .await
        .unwrap();

    let device = registry.get("192.168.0.10").await.unwrap().unwrap();
    assert_eq!(device.model.as_deref(), Some("UE43TU7022KXXH"));
    assert_eq!(device.display_name.as_deref(), Some("Living Room"));
    assert_eq!(device.platform_version.as_deref(), Some("5.5"));
}

#[test]
async fn model_change_rederives_platform_version() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(DeviceRecord::new("192.168.0.10").with_model("UE40JU6400"))
        .await
        .unwrap();
    let device = registry.get("192.168.0.10").await.unwrap().unwrap();
    assert_eq!(device.platform_version.as_deref(), Some("2.3"));

    registry
        .upsert(DeviceRecord::new("192.168.0.10").with_model("UE55CU8000"))
        .await
        .unwrap();
    let device = registry.get("192.168.0.10").await.unwrap().unwrap();
    assert_eq!(device.platform_version.as_deref(), Some("7.0"));
}

#[test]
async fn last_connected_at_is_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(DeviceRecord::new("192.168.0.10"))
        .await
        .unwrap();

    registry
        .set_connection_status("192.168.0.10", true)
        .await
        .unwrap();
    let first = registry
        .get("192.168.0.10")
        .await
        .unwrap()
        .unwrap()
        .last_connected_at
        .unwrap();

    registry
        .set_connection_status("192.168.0.10", true)
        .await
        .unwrap();
    let second = registry
        .get("192.168.0.10")
        .await
        .unwrap()
        .unwrap()
        .last_connected_at
        .unwrap();

    assert!(second >= first);
}

#[test]
async fn connected_devices_always_carry_a_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(DeviceRecord::new("192.168.0.10"))
        .await
        .unwrap();
    registry
        .set_connection_status("192.168.0.10", true)
        .await
        .unwrap();

    let device = registry.get("192.168.0.10").await.unwrap().unwrap();
    assert!(device.is_connected);
    assert!(device.last_connected_at.is_some());
}

#[test]
async fn clear_is_idempotent_and_always_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;
    let mut listener = registry.subscribe();

    registry
        .upsert(DeviceRecord::new("192.168.0.10"))
        .await
        .unwrap();
    assert!(listener.try_changed());

    registry.clear().await.unwrap();
    assert!(registry.list().await.unwrap().is_empty());
    assert!(listener.try_changed());

    registry.clear().await.unwrap();
    assert!(registry.list().await.unwrap().is_empty());
    assert!(listener.try_changed());
}

#[test]
async fn mutations_on_unknown_addresses_are_silent_noops() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;
    let mut listener = registry.subscribe();

    registry.rename("10.9.9.9", "Ghost").await.unwrap();
    registry.remove("10.9.9.9").await.unwrap();
    registry
        .set_connection_status("10.9.9.9", true)
        .await
        .unwrap();

    assert!(registry.list().await.unwrap().is_empty());
    assert!(!listener.try_changed());
}

#[test]
async fn history_survives_a_registry_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_registry_path(&dir);

    {
        let registry = DeviceRegistry::with_persistence(&path).await.unwrap();
        registry
            .upsert(DeviceRecord::new("192.168.0.10").with_display_name("Living Room"))
            .await
            .unwrap();
    }

    let registry = DeviceRegistry::with_persistence(&path).await.unwrap();
    let devices = registry.list().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].display_name.as_deref(), Some("Living Room"));
}

#[test]
async fn connect_success_registers_a_new_device() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;
    let bridge = Arc::new(ScriptedBridge::new(
        Ok("connected to 10.0.0.5:26101"),
        "10.0.0.5:26101\tdevice\tUE43TU7022KXXH\n",
    ));

    let connector = connector(registry.clone(), bridge.clone(), Arc::new(GeneratedNamePrompt));
    let record = connector.connect("10.0.0.5:26101").await.unwrap();

    assert_eq!(record.address, "10.0.0.5");
    assert!(record.is_connected);
    assert_eq!(record.model.as_deref(), Some("UE43TU7022KXXH"));
    assert_eq!(record.platform_version.as_deref(), Some("5.5"));
    assert!(record.display_name.is_some());
    assert!(record.last_connected_at.is_some());

    let devices = registry.list().await.unwrap();
    assert_eq!(devices.len(), 1);

    // The daemon was started before the connect verb ran
    let calls = bridge.calls().await;
    assert_eq!(
        calls,
        vec!["start-server", "connect 10.0.0.5:26101", "devices"]
    );
}

#[test]
async fn connect_uses_the_prompted_name() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;
    let bridge = Arc::new(ScriptedBridge::new(
        Ok("connected to 10.0.0.5:26101"),
        "10.0.0.5:26101\tdevice\tUE43TU7022KXXH\n",
    ));

    let connector = connector(
        registry.clone(),
        bridge,
        Arc::new(FixedNamePrompt("Bedroom TV")),
    );
    let record = connector.connect("10.0.0.5").await.unwrap();
    assert_eq!(record.display_name.as_deref(), Some("Bedroom TV"));
}

#[test]
async fn connect_reconfirms_known_devices_without_renaming() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(
            DeviceRecord::new("10.0.0.5")
                .with_display_name("Bedroom TV")
                .with_model("UE43TU7022KXXH"),
        )
        .await
        .unwrap();

    let bridge = Arc::new(ScriptedBridge::new(Ok("connected to 10.0.0.5"), ""));
    let connector = connector(
        registry.clone(),
        bridge.clone(),
        Arc::new(FixedNamePrompt("Wrong Name")),
    );
    let record = connector.connect("10.0.0.5:26101").await.unwrap();

    assert_eq!(record.display_name.as_deref(), Some("Bedroom TV"));
    assert!(record.is_connected);
    assert_eq!(registry.list().await.unwrap().len(), 1);

    // Known device: no discovery pass, no prompt
    assert!(!bridge.calls().await.contains(&"devices".to_string()));
}

#[test]
async fn connect_failure_leaves_the_registry_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(DeviceRecord::new("192.168.0.10"))
        .await
        .unwrap();
    let before = registry.list().await.unwrap();
    let mut listener = registry.subscribe();

    let bridge = Arc::new(ScriptedBridge::new(
        Ok("unable to reach 10.0.0.5"),
        "",
    ));
    let connector = connector(registry.clone(), bridge, Arc::new(GeneratedNamePrompt));
    let err = connector.connect("10.0.0.5").await.unwrap_err();

    assert!(matches!(err, DeviceError::ConnectFailed { .. }));
    assert!(err.to_string().contains("restarting"));
    assert_eq!(registry.list().await.unwrap(), before);
    assert!(!listener.try_changed());
}

#[test]
async fn connect_process_error_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    let bridge = Arc::new(ScriptedBridge::new(Err("no such binary"), ""));
    let connector = connector(registry.clone(), bridge, Arc::new(GeneratedNamePrompt));

    let err = connector.connect("10.0.0.5").await.unwrap_err();
    assert!(matches!(err, DeviceError::ConnectFailed { .. }));
    assert!(registry.list().await.unwrap().is_empty());
}

#[test]
async fn disconnect_flips_the_connection_state() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;

    registry
        .upsert(DeviceRecord::new("10.0.0.5"))
        .await
        .unwrap();
    registry
        .set_connection_status("10.0.0.5", true)
        .await
        .unwrap();

    let bridge = Arc::new(ScriptedBridge::new(Ok(""), ""));
    let connector = connector(registry.clone(), bridge, Arc::new(GeneratedNamePrompt));
    connector.disconnect("10.0.0.5:26101").await.unwrap();

    let device = registry.get("10.0.0.5").await.unwrap().unwrap();
    assert!(!device.is_connected);
    // The timestamp from the connected period is kept
    assert!(device.last_connected_at.is_some());
}

#[test]
async fn restart_starts_even_when_stop_fails() {
    let mut bridge = ScriptedBridge::new(Ok(""), "");
    bridge.kill_fails = true;
    let bridge = Arc::new(bridge);

    let prober = ServerProber::new(bridge.clone(), "tvbridge-test-no-such-daemon");
    prober.restart().await.unwrap();

    let calls = bridge.calls().await;
    assert_eq!(calls, vec!["kill-server", "start-server"]);
}

#[test]
async fn status_poller_publishes_and_shuts_down() {
    let bridge = Arc::new(ScriptedBridge::new(Ok(""), ""));
    let prober = ServerProber::new(bridge, "tvbridge-test-no-such-daemon");

    let poller = StatusPoller::spawn(prober, Duration::from_millis(10));
    let mut rx = poller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("poll publishes within 5s")
        .unwrap();
    assert_eq!(*rx.borrow(), ServerStatus::Stopped);

    poller.shutdown();
    poller.join().await;
}

#[test]
async fn service_surface_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = bound_registry(&dir).await;
    let bridge = Arc::new(ScriptedBridge::new(
        Ok("connected to 10.0.0.5"),
        "10.0.0.5:26101\tdevice\tUE55CU8000\n",
    ));
    let prober = ServerProber::new(bridge.clone(), "tvbridge-test-no-such-daemon");
    let service = DeviceService::new(
        registry,
        bridge,
        prober,
        Arc::new(FixedNamePrompt("Office TV")),
    );
    let mut listener = service.subscribe_changes();

    service.connect("10.0.0.5").await.unwrap();
    assert!(listener.try_changed());

    service.rename("10.0.0.5", "Den TV").await.unwrap();
    let devices = service.list_devices().await.unwrap();
    assert_eq!(devices[0].display_name.as_deref(), Some("Den TV"));

    let discovered = service.discover().await;
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].platform_version, "7.0");

    service.remove("10.0.0.5").await.unwrap();
    assert!(service.list_devices().await.unwrap().is_empty());
}
