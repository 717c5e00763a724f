// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hold command: acquire, sleep, release

use crate::adapters::Coordinator;
use anyhow::Result;
use lk_core::{TokenGen, UuidTokenGen};
use std::time::Duration;

#[derive(clap::Args)]
pub struct HoldArgs {
    /// Lock name (the key prefix is added)
    key: String,

    /// How long to hold the lock before releasing it
    #[arg(long = "for", value_parser = humantime::parse_duration, default_value = "5s")]
    hold_for: Duration,

    /// Owner token to store (random by default)
    #[arg(long)]
    token: Option<String>,

    /// Record expiry (defaults to the configured default_expiry)
    #[arg(long, value_parser = humantime::parse_duration)]
    expiry: Option<Duration>,
}

pub async fn handle(coordinator: &Coordinator, args: HoldArgs) -> Result<()> {
    let token = args.token.unwrap_or_else(|| UuidTokenGen.next());
    let expiry = args.expiry.unwrap_or(coordinator.config().default_expiry);

    coordinator.lock_with_expiry(&args.key, &token, expiry).await?;
    println!("Acquired {} (token {})", args.key, token);

    tokio::select! {
        _ = tokio::time::sleep(args.hold_for) => {}
        _ = tokio::signal::ctrl_c() => eprintln!("\nInterrupted, releasing early"),
    }

    coordinator.unlock(&args.key, &token).await?;
    println!("Released {}", args.key);
    Ok(())
}
