//! Arena coordinator server.
//!
//! Loads `arena.toml` (or the file given with `--config`), authenticates
//! joins against the `[[auth.tokens]]` table, and logs persistence writes
//! instead of storing them. Stops on Ctrl-C.

mod cli;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use arena::prelude::*;
use clap::Parser;
use tracing::{error, info, warn};

use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ArenaConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    args.apply(&mut config);
    logging::init(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting arena server"
    );

    let tokens = config.auth.token_table();
    if tokens.is_empty() {
        warn!("no auth tokens configured, every join will be rejected");
    }

    let server = ArenaServerBuilder::new()
        .config(config.clone())
        .build(tokens, LogGateway)
        .await
        .context("failed to start server")?;
    info!(addr = %server.local_addr()?, "listening");

    if config.monitor_interval_secs > 0 {
        tokio::spawn(report_roster(
            server.monitor(),
            Duration::from_secs(config.monitor_interval_secs),
        ));
    }

    server.run_until(shutdown_signal()).await?;
    info!("arena server stopped");
    Ok(())
}

/// Logs who is in the arena every `every`.
async fn report_roster(monitor: ArenaMonitor, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let roster = monitor.roster().await;
        let names: Vec<&str> = roster.iter().map(|p| p.username.as_str()).collect();
        info!(players = roster.len(), ?names, "roster");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received");
}
