//! comms-monitor - unified live stream over multi-agent logs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comms_monitor::config::{ConfigLoader, MonitorConfig};
use comms_monitor::dashboard::{AppState, DashboardServer};
use comms_monitor::display;
use comms_monitor::event::{Event, EventHub, EventStore};
use comms_monitor::watcher::{SourceRegistry, Watcher};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(
    name = "comms-monitor",
    about = "Unified live stream over multi-agent comms logs, transcripts and telemetry",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to ./.comms-monitor.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch all sources and serve the HTTP API.
    Serve {
        /// Project root containing interlateral_dna/.
        #[arg(long)]
        project_root: Option<PathBuf>,
        /// Host address to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print new events to the terminal as they arrive.
    Tail {
        /// Project root containing interlateral_dna/.
        #[arg(long)]
        project_root: Option<PathBuf>,
        /// Print one JSON object per event.
        #[arg(long)]
        json: bool,
        /// Do not truncate long content.
        #[arg(long)]
        raw: bool,
    },
    /// Print discovered sources as JSON.
    Status {
        /// Project root containing interlateral_dna/.
        #[arg(long)]
        project_root: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>, project_root: Option<PathBuf>) -> Result<MonitorConfig, BoxError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = loader.load()?;
    Ok(match project_root {
        Some(root) => config.with_project_root(root),
        None => config,
    })
}

/// Cancel `cancel` on Ctrl-C.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Received Ctrl-C, shutting down");
        cancel.cancel();
    });
}

async fn serve(mut config: MonitorConfig, host: Option<String>, port: Option<u16>) -> Result<(), BoxError> {
    if let Some(host) = host {
        config.dashboard.host = host;
    }
    if let Some(port) = port {
        config.dashboard.port = port;
    }

    let log_path = config.event_log_path();
    let store = match EventStore::open(&log_path, config.buffer_capacity).await {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "Durable event log unavailable, keeping events in memory only");
            EventStore::in_memory(config.buffer_capacity)
        }
    };
    let hub = Arc::new(EventHub::new(store));
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let (mut watcher, sources) = Watcher::new(config.layout());
    watcher.start().await;

    // A watcher failure also stops the server.
    let watcher_task = {
        let hub = Arc::clone(&hub);
        let cancel = cancel.clone();
        let debounce = config.debounce();
        tokio::spawn(async move {
            let result = watcher.run(hub.as_ref(), debounce, cancel.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Watcher stopped, shutting down dashboard");
                cancel.cancel();
            }
            result
        })
    };

    let state = AppState::new(hub, sources)
        .with_cancel(cancel.clone())
        .with_initial_tail_lines(config.initial_tail_lines);
    let server_result = DashboardServer::new(state)
        .with_config(config.dashboard)
        .run()
        .await;

    cancel.cancel();
    let watcher_result = watcher_task.await;

    server_result?;
    watcher_result??;
    Ok(())
}

async fn tail(config: MonitorConfig, json: bool, raw: bool) -> Result<(), BoxError> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let (mut watcher, _sources) = Watcher::new(config.layout());
    watcher.start().await;
    if !json {
        display::print_sources(watcher.registry());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let debounce = config.debounce();
    let watcher_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.run(&tx, debounce, cancel).await })
    };

    while let Some(event) = rx.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            display::print_event(&event, raw);
        }
    }

    watcher_task.await??;
    Ok(())
}

fn status(config: &MonitorConfig) -> Result<(), BoxError> {
    let registry = SourceRegistry::discover(&config.layout());
    println!("{}", serde_json::to_string_pretty(&registry)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve {
            project_root,
            host,
            port,
        } => match load_config(cli.config, project_root) {
            Ok(config) => serve(config, host, port).await,
            Err(e) => Err(e),
        },
        Commands::Tail {
            project_root,
            json,
            raw,
        } => match load_config(cli.config, project_root) {
            Ok(config) => tail(config, json, raw).await,
            Err(e) => Err(e),
        },
        Commands::Status { project_root } => {
            load_config(cli.config, project_root).and_then(|config| status(&config))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
