// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use server_supervisor::config::{self, SupervisorConfig};
use server_supervisor::{LivenessProber, spawn_server};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "server-supervisor", version, about = "Keep a local server running")]
struct Cli {
    /// Config file (default: $SERVER_SUPERVISOR_CONFIG or /etc/server-supervisor/supervisor.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the server and restart it until SIGTERM/SIGINT (default)
    Run,
    /// Exit 0 if the server API answers a heartbeat, 1 otherwise
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(config::config_path);
    let cfg = config::load_config(&path)?;
    simple_logger::init_with_level(cfg.log_level()?)?;
    if !path.exists() {
        info!("config file {} not found, using defaults", path.display());
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cfg).await,
        Command::Status => status(cfg).await,
    }
}

async fn run(cfg: SupervisorConfig) -> Result<ExitCode> {
    info!(
        "server-supervisor starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = CancellationToken::new();
    let handle = spawn_server(shutdown.clone(), &cfg.command, cfg.spawn_options())
        .with_context(|| format!("supervising {}", cfg.command))?;

    wait_for_signal().await?;
    shutdown.cancel();
    if cfg.stop_timeout.is_none() {
        info!("waiting for the server to exit on its own");
    }

    let code = handle.wait().await;
    info!("server-supervisor shutting down (server exit code {code})");
    Ok(ExitCode::SUCCESS)
}

async fn status(cfg: SupervisorConfig) -> Result<ExitCode> {
    let prober = LivenessProber::new(cfg.api_config());
    if prober.is_running(cfg.probe_timeout()).await {
        info!("server is running at {}", cfg.api_host);
        Ok(ExitCode::SUCCESS)
    } else {
        info!("server is not running at {}", cfg.api_host);
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to set up SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C");
    Ok(())
}
