// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contend command: many concurrent holders on one key

use crate::adapters::Coordinator;
use anyhow::Result;
use clap::ValueEnum;
use lk_core::{MetricsSnapshot, SequentialTokenGen, TokenGen};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct ContendArgs {
    /// Lock name (the key prefix is added)
    key: String,

    /// Concurrent callers
    #[arg(long, default_value_t = 8)]
    tasks: u32,

    /// Lock/unlock cycles per caller
    #[arg(long, default_value_t = 10)]
    rounds: u32,

    /// Time spent inside the critical section per cycle
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10ms")]
    hold: Duration,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ContendReport {
    key: String,
    tasks: u32,
    rounds: u32,
    acquired: u64,
    failed: u64,
    /// Cycles that entered the critical section while another caller was in it
    overlaps: u64,
    metrics: MetricsSnapshot,
}

impl fmt::Display for ContendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} tasks x {} rounds",
            self.key, self.tasks, self.rounds
        )?;
        writeln!(
            f,
            "acquired: {}, failed: {}, overlaps: {}",
            self.acquired, self.failed, self.overlaps
        )?;
        write!(f, "{}", self.metrics)
    }
}

#[derive(Default)]
struct Tally {
    inside: AtomicU64,
    acquired: AtomicU64,
    failed: AtomicU64,
    overlaps: AtomicU64,
}

pub async fn handle(coordinator: &Coordinator, args: ContendArgs) -> Result<()> {
    let tokens = SequentialTokenGen::new("contend");
    let tally = Tally::default();

    let callers = (0..args.tasks).map(|_| cycle(coordinator, &args, &tokens, &tally));
    futures::future::join_all(callers).await;

    let report = ContendReport {
        key: coordinator.config().qualify(&args.key),
        tasks: args.tasks,
        rounds: args.rounds,
        acquired: tally.acquired.load(Ordering::Relaxed),
        failed: tally.failed.load(Ordering::Relaxed),
        overlaps: tally.overlaps.load(Ordering::Relaxed),
        metrics: coordinator.metrics(),
    };

    match args.format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.overlaps > 0 {
        anyhow::bail!("mutual exclusion violated {} times", report.overlaps);
    }
    Ok(())
}

async fn cycle(
    coordinator: &Coordinator,
    args: &ContendArgs,
    tokens: &SequentialTokenGen,
    tally: &Tally,
) {
    for _ in 0..args.rounds {
        let token = tokens.next();
        if let Err(e) = coordinator.lock(&args.key, &token).await {
            tracing::warn!(token = %token, error = %e, "acquisition failed");
            tally.failed.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        if tally.inside.fetch_add(1, Ordering::SeqCst) > 0 {
            tally.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        tally.acquired.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(args.hold).await;
        tally.inside.fetch_sub(1, Ordering::SeqCst);

        if let Err(e) = coordinator.unlock(&args.key, &token).await {
            tracing::warn!(token = %token, error = %e, "release failed");
        }
    }
}
