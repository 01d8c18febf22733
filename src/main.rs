//! modhost: modular web application host.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ zone ──▶ mounter ──▶ module ──▶ resource
//!                         │                                            │
//!                         │            snapshot (ArcSwap)              ▼
//!                         │        ┌─────────────────────────┐    link rewriter
//!                         └───────▶│ config + Application    │         │
//!                                  └────────────▲────────────┘         ▼
//!                                               │                 Client Response
//!                        configuration pass ────┘
//!                 discovery → wiring → mounting
//!                        ▲
//!                 config watcher (autoreload)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use modhost::config::{load_config, ConfigWatcher};
use modhost::lifecycle::{self, Shutdown};
use modhost::observability::{logging, metrics};
use modhost::HostServer;

#[derive(Parser)]
#[command(name = "modhost")]
#[command(about = "Serve a tree of wired web modules", long_about = None)]
struct Cli {
    /// Host configuration file.
    #[arg(short, long, default_value = "modhost.toml")]
    config: PathBuf,

    /// Wire the modules, print the module table as JSON and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.check {
        logging::init("warn");
        return Ok(run_check(&cli.config));
    }

    let config = load_config(&cli.config)?;
    logging::init(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        name = %config.name,
        bind_address = %config.listener.bind_address,
        autoreload = config.autoreload,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    // Without autoreload the sender is dropped and the server never reloads.
    let (_watcher, config_updates) = if config.autoreload {
        let (watcher, updates) = ConfigWatcher::new(&cli.config, &config);
        (Some(watcher.run()?), updates)
    } else {
        (None, mpsc::unbounded_channel().1)
    };

    let server = HostServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

fn run_check(path: &std::path::Path) -> ExitCode {
    match lifecycle::check(path) {
        Ok(app) => match serde_json::to_string_pretty(&app.describe()) {
            Ok(table) => {
                println!("{table}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
