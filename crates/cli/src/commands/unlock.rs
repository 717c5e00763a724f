// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unlock command

use crate::adapters::Coordinator;
use anyhow::Result;

#[derive(clap::Args)]
pub struct UnlockArgs {
    /// Lock name (the key prefix is added)
    key: String,

    /// Owner token the lock was acquired with
    #[arg(long)]
    token: String,
}

pub async fn handle(coordinator: &Coordinator, args: UnlockArgs) -> Result<()> {
    coordinator.unlock(&args.key, &args.token).await?;
    println!("Released {}", args.key);
    Ok(())
}
