//! Command-line interface for tvbridge.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tvbridge_core::config::{env_vars, storage};
use tvbridge_devices::bridge::BridgeTransport;
use tvbridge_devices::inspector;
use tvbridge_devices::{
    BridgeClient, DeviceRecord, DeviceRegistry, DeviceService, NamePrompt, ServerProber,
    StatusPoller,
};

/// Manage TV devices over the bridge daemon.
#[derive(Parser, Debug)]
#[command(name = "tvbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Bridge daemon binary to invoke.
    #[arg(long, global = true)]
    bridge_bin: Option<String>,

    /// Directory holding the device history database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List known devices.
    List,
    /// Query the daemon for currently attached devices.
    Discover,
    /// Connect to a device by address (port optional).
    Connect {
        address: String,
        /// Display name to use if the device is new.
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Disconnect a device.
    Disconnect { address: String },
    /// Rename a known device.
    Rename { address: String, name: String },
    /// Remove a device from the history.
    Remove { address: String },
    /// Clear the whole device history.
    Clear,
    /// Probe the bridge server once.
    Status,
    /// Poll the bridge server until interrupted.
    Watch {
        /// Poll interval in seconds.
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Bridge server lifecycle.
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
    /// Print the DevTools inspector URL for a device's debug port.
    Inspect {
        address: String,
        /// Remote-debugging port on the device.
        #[arg(short, long)]
        port: u16,
    },
}

/// Server lifecycle subcommands.
#[derive(Subcommand, Debug)]
enum ServerAction {
    Start,
    Stop,
    Restart,
}

/// Name prompt fed from the command line; absent means "take the
/// generated suggestion".
struct CliNamePrompt {
    name: Option<String>,
}

#[async_trait]
impl NamePrompt for CliNamePrompt {
    async fn prompt_name(&self, _suggested: &str) -> Option<String> {
        self.name.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let bin = args.bridge_bin.clone().unwrap_or_else(env_vars::bridge_bin);
    let data_dir = args.data_dir.clone().unwrap_or_else(env_vars::data_dir);
    let db_path = data_dir.join(storage::DB_FILE);

    let name = match &args.command {
        Command::Connect { name, .. } => name.clone(),
        _ => None,
    };

    let transport: Arc<dyn BridgeTransport> = Arc::new(BridgeClient::new(bin.as_str()));
    let prober = ServerProber::new(transport.clone(), bin.as_str());
    let registry = Arc::new(DeviceRegistry::with_persistence(&db_path).await?);
    let service = DeviceService::new(
        registry,
        transport,
        prober.clone(),
        Arc::new(CliNamePrompt { name }),
    );

    match args.command {
        Command::List => {
            let devices = service.list_devices().await?;
            if devices.is_empty() {
                println!("no known devices");
            }
            for device in devices {
                print_record(&device);
            }
        }
        Command::Discover => {
            let devices = service.discover().await;
            if devices.is_empty() {
                println!("no devices attached");
            }
            for device in devices {
                println!(
                    "{:<18} {:<18} {}",
                    device.address, device.model, device.platform_version
                );
            }
        }
        Command::Connect { address, .. } => {
            let record = service.connect(&address).await?;
            println!("connected to {}", record.address);
            print_record(&record);
        }
        Command::Disconnect { address } => {
            service.disconnect(&address).await?;
            println!("disconnected {address}");
        }
        Command::Rename { address, name } => {
            service.rename(&address, &name).await?;
        }
        Command::Remove { address } => {
            service.remove(&address).await?;
        }
        Command::Clear => {
            service.clear().await?;
            println!("device history cleared");
        }
        Command::Status => {
            println!("bridge server: {}", service.refresh_server_status().await);
        }
        Command::Watch { interval } => {
            let period = interval
                .map(Duration::from_secs)
                .unwrap_or_else(env_vars::poll_interval);
            watch_server(prober, period).await?;
        }
        Command::Server { action } => {
            let output = match action {
                ServerAction::Start => prober.start().await?,
                ServerAction::Stop => prober.stop().await?,
                ServerAction::Restart => prober.restart().await?,
            };
            let output = output.trim();
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Command::Inspect { address, port } => {
            println!("{}", inspector::inspector_url(&address, port).await?);
        }
    }

    Ok(())
}

/// Poll the server and print every status transition until ctrl-c.
async fn watch_server(prober: ServerProber, period: Duration) -> Result<()> {
    let poller = StatusPoller::spawn(prober, period);
    let mut rx = poller.subscribe();

    println!("watching bridge server (ctrl-c to stop)");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("bridge server: {}", *rx.borrow());
            }
        }
    }

    poller.shutdown();
    poller.join().await;
    Ok(())
}

fn print_record(device: &DeviceRecord) {
    let name = device.display_name.as_deref().unwrap_or("(unnamed)");
    let model = device.model.as_deref().unwrap_or("-");
    let version = device.platform_version.as_deref().unwrap_or("unknown");
    let state = if device.is_connected {
        "connected"
    } else {
        "disconnected"
    };
    let last = device
        .last_connected_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{name:<20} {:<18} {model:<18} {version:<8} {state:<12} {last}",
        device.address
    );
}
