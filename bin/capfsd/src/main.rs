//! Capfs Daemon - serves the in-memory file store over TCP.
//!
//! Provides:
//! - The listener and one session per connection
//! - Capability list output whenever the file table changes
//! - TOML configuration with command-line overrides

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use capfs_server::{Server, ServerConfig};
use capfs_store::{CapabilityList, FileSnapshot, FileTable, StoreConfig};
use clap::Parser;
use serde::Deserialize;
use tokio::signal;
use tokio::time::interval;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Capfs daemon.
#[derive(Parser)]
#[command(name = "capfsd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, default_value = "~/.capfs/config.toml")]
    config: PathBuf,

    /// Listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Maximum concurrent clients
    #[arg(long)]
    max_clients: Option<usize>,

    /// Seconds between capability list checks (0 disables)
    #[arg(long)]
    capability_list_secs: Option<u64>,
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct DaemonConfig {
    /// Listener and session settings
    server: ServerConfig,
    /// File table settings
    store: StoreConfig,
    /// Seconds between capability list checks (0 disables)
    capability_list_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            capability_list_secs: 1,
        }
    }
}

impl DaemonConfig {
    /// Applies command-line overrides.
    fn apply(&mut self, cli: &Cli) {
        if let Some(addr) = cli.listen {
            self.server.listen_addr = addr;
        }
        if let Some(max) = cli.max_clients {
            self.server.max_clients = max;
        }
        if let Some(secs) = cli.capability_list_secs {
            self.capability_list_secs = secs;
        }
    }
}

/// Load configuration from TOML file.
fn load_config(path: &Path) -> Result<DaemonConfig> {
    let path = expand_tilde(path);

    if !path.exists() {
        info!("No config file found at {:?}, using defaults", path);
        return Ok(DaemonConfig::default());
    }

    let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Returns the capability list if the table differs from `last`.
fn capability_list_update(
    table: &FileTable,
    last: &mut Option<Vec<FileSnapshot>>,
) -> Option<CapabilityList> {
    let files = table.list();
    if last.as_ref() == Some(&files) {
        return None;
    }
    *last = Some(files.clone());
    Some(CapabilityList(files))
}

/// Prints the capability list whenever the table has changed, checking every
/// `period`.
async fn capability_list_loop(table: Arc<FileTable>, period: Duration) {
    let mut ticker = interval(period);
    let mut last = None;
    loop {
        ticker.tick().await;
        if let Some(list) = capability_list_update(&table, &mut last) {
            println!("{}", list);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    let mut config = load_config(&cli.config)?;
    config.apply(&cli);

    let table = Arc::new(FileTable::new(config.store.clone()));
    let server = Server::bind(config.server.clone(), Arc::clone(&table))
        .await
        .context("Failed to start listener")?;
    let addr = server.local_addr()?;

    if config.capability_list_secs > 0 {
        tokio::spawn(capability_list_loop(
            Arc::clone(&table),
            Duration::from_secs(config.capability_list_secs),
        ));
    }

    println!("capfs daemon running");
    println!("  Listen: {}", addr);
    println!("  Max clients: {}", config.server.max_clients);
    println!();
    println!("Press Ctrl+C to stop");

    server
        .run(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
        })
        .await?;

    info!(files = table.len(), "Daemon stopped");
    Ok(())
}
