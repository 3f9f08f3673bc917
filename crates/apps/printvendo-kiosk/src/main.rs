//! PrintVendo kiosk CLI entry point.

mod cli;
mod commands;
mod config;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use printvendo_session::SessionError;
use printvendo_types::MachineId;

use crate::cli::Cli;
use crate::config::KioskConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        // Session failures are shown in the client-facing taxonomy; the
        // detail stays in the logs.
        let message = match err.downcast_ref::<SessionError>() {
            Some(session_err) => session_err.as_client_error().to_string(),
            None => err.to_string(),
        };
        eprintln!("{} {message}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config)?;

    let machine_raw = cli
        .machine
        .or_else(|| {
            if config.machine.id.is_empty() {
                None
            } else {
                Some(config.machine.id.clone())
            }
        })
        .ok_or_else(|| anyhow::anyhow!("no machine id: pass --machine or set [machine] id"))?;
    let machine = MachineId::new(machine_raw).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let manager = Arc::new(commands::build_manager(&config));
    commands::dispatch(cli.command, manager, machine).await
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<KioskConfig> {
    match path {
        Some(path) => KioskConfig::load(&path),
        None => {
            let default = PathBuf::from("printvendo.toml");
            if default.exists() {
                KioskConfig::load(&default)
            } else {
                Ok(KioskConfig::default())
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
