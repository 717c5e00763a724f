// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lk - latchkey distributed lock CLI

mod adapters;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{contend, hold, unlock};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lk",
    version,
    about = "latchkey - Distributed locks over a Redis-compatible store"
)]
struct Cli {
    /// Store URL
    #[arg(
        long,
        global = true,
        env = "LK_REDIS_URL",
        default_value = "redis://127.0.0.1:6379"
    )]
    redis_url: String,

    /// Coordinator config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a lock, hold it, then release it
    Hold(hold::HoldArgs),
    /// Release a lock held by a token
    Unlock(unlock::UnlockArgs),
    /// Run concurrent lock/unlock cycles and report metrics
    Contend(contend::ContendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    // Config errors surface before any connection attempt
    let config = adapters::load_config(cli.config.as_deref())?;
    let coordinator = adapters::connect(&cli.redis_url, config).await?;

    let result = match cli.command {
        Commands::Hold(args) => hold::handle(&coordinator, args).await,
        Commands::Unlock(args) => unlock::handle(&coordinator, args).await,
        Commands::Contend(args) => contend::handle(&coordinator, args).await,
    };

    if let Err(e) = coordinator.close().await {
        tracing::warn!(error = %e, "coordinator closed with an error");
    }
    result
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
