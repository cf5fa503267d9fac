//! Dockyard CLI
//!
//! Loads plugin archives and optionally posts a text event to every plugin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dockyard::{HostConfig, Linker, PluginHost};

/// Dockyard Plugin Host
#[derive(Parser, Debug)]
#[command(name = "dockyard")]
#[command(about = "Load plugin archives and dispatch events to them", long_about = None)]
struct Args {
    /// Archive files or directories to scan for archives
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Path to a dockyard.toml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Post a string event with this text to every loaded plugin
    #[arg(long)]
    post: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dockyard=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Dockyard v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => HostConfig::load(path).await?,
        None => HostConfig::default(),
    };

    let host = Arc::new(PluginHost::new(config).with_linker(Linker::with_builtins()));
    let plugins = host.load_concurrent(args.paths.as_slice()).await;

    if plugins.is_empty() {
        warn!("No plugins loaded");
    }
    for plugin in &plugins {
        info!(
            "  {} - {} handler(s)",
            plugin.archive().display(),
            plugin.handler_count()
        );
    }

    if let Some(text) = args.post {
        let event = host.types().string(text);
        for plugin in &plugins {
            if let Err(e) = plugin.post(&event) {
                error!("Failed to post to {}: {}", plugin, e);
            }
        }
    }

    Ok(())
}
