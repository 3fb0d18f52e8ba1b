//! queueplan-d: keeps a remote planner in step with a host queue.
//!
//! Loads the host queue from a state file, installs the configured planner,
//! and runs the reconciliation loop until interrupted.
//!
//! # Usage
//!
//! ```text
//! queueplan-d run --config /etc/queueplan/queueplan.toml
//! queueplan-d check http://planner.local:8080/
//! ```

mod config;
mod host;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use queueplan_remote::{HyperTransport, IntervalTicker, SchedulerFacade};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DaemonConfig, parse_duration};
use crate::host::{HostState, LoggingSink};

const DEFAULT_FILTER: &str = "info,queueplan=debug";

#[derive(Parser)]
#[command(name = "queueplan-d", about = "Remote queue planning daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reconciliation loop against the configured planner.
    Run {
        /// Path to queueplan.toml.
        #[arg(long, default_value = "queueplan.toml")]
        config: PathBuf,

        /// Planner base address, overriding `remote.url`.
        #[arg(long)]
        url: Option<String>,
    },
    /// Check that an address answers as a remote planner.
    Check {
        /// Planner base address.
        url: String,

        /// Bound on the info request, e.g. "5s".
        #[arg(long, default_value = "10s")]
        timeout: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, url } => {
            let config = DaemonConfig::from_file(&config)?;
            init_tracing(config.log.filter.as_deref(), config.log.json);
            run(config, url).await
        }
        Command::Check { url, timeout } => {
            init_tracing(None, false);
            check(&url, parse_duration(&timeout)?).await
        }
    }
}

fn init_tracing(configured: Option<&str>, json: bool) {
    let fallback = configured.unwrap_or(DEFAULT_FILTER);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: DaemonConfig, url_override: Option<String>) -> anyhow::Result<()> {
    info!("queueplan daemon starting");

    let state = match &config.host.state_file {
        Some(path) => {
            let state = HostState::from_file(path)?;
            info!(path = %path.display(), items = state.items.len(), nodes = state.nodes.len(), "host state loaded");
            state
        }
        None => {
            warn!("no host state file configured, planning an empty queue");
            HostState::default()
        }
    };

    let transport = Arc::new(HyperTransport::new(config.remote.timeout()?));
    let facade = SchedulerFacade::new(Arc::new(state), transport);
    let sink = Arc::new(LoggingSink::default());

    match url_override.or(config.remote.url) {
        Some(url) => {
            if let Err(e) = facade.reconfigure(&url).await {
                warn!(%url, error = %e, "remote planner not started, reconciliation stays idle");
            }
        }
        None => warn!("no remote planner configured"),
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconciler = facade.reconciler(sink.clone(), IntervalTicker::default());
    let loop_handle = tokio::spawn(async move {
        reconciler.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = loop_handle.await;

    facade.shutdown().await;

    info!(
        reevaluations = sink.requests(),
        "queueplan daemon stopped"
    );
    Ok(())
}

async fn check(url: &str, timeout: Duration) -> anyhow::Result<()> {
    let transport = Arc::new(HyperTransport::new(timeout));
    let facade = SchedulerFacade::new(Arc::new(HostState::default()), transport);

    match facade.check(url).await {
        Ok(name) => {
            println!("{url}: remote scheduler \"{name}\"");
            Ok(())
        }
        Err(e) if e.is_malformed_address() => bail!("{e}"),
        Err(e) => bail!("{url}: unreachable or not a valid remote scheduler: {e}"),
    }
}
