// Path: crates/cli/src/commands/watch.rs

use crate::util;
use crate::GlobalArgs;
use anyhow::{Context as _, Result};
use clap::Parser;
use claimkit_telemetry::http::WatchHealth;
use claimkit_types::prelude::*;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Serve Prometheus metrics and `/healthz` on this address.
    #[clap(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Refresh interval in seconds; defaults to the configured interval.
    #[clap(long)]
    pub interval: Option<u64>,
}

fn print_transitions(global: &GlobalArgs, transitions: &[Transition]) -> Result<()> {
    for t in transitions {
        if global.json {
            println!("{}", serde_json::to_string(t)?);
        } else {
            let state = |s: Option<RewardState>| s.map_or("unlisted", |s| s.as_str());
            println!("{}: {} -> {}", t.id, state(t.before), state(t.after));
        }
    }
    Ok(())
}

pub async fn run(global: &GlobalArgs, args: WatchArgs) -> Result<()> {
    let ctx = util::connect(global)?;
    let interval = Duration::from_secs(args.interval.unwrap_or(ctx.config.refresh.interval_secs).max(1));

    // Two missed refreshes in a row make `/healthz` report unavailable.
    let health = WatchHealth::new(interval * 2);
    if let Some(addr) = args.metrics_addr {
        claimkit_telemetry::prometheus::install().context("installing metrics")?;
        tokio::spawn(claimkit_telemetry::http::run_server(addr, health.clone(), async {
            let _ = tokio::signal::ctrl_c().await;
        }));
    }

    let mut previous = ctx.engine.fetch_claimable_rewards(&ctx.session).await?;
    health.record_success(previous.taken_at);
    tracing::info!(target: "cli", total = previous.total, ?interval, "watching rewards");

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target: "cli", "stopping watch");
                return Ok(());
            }
            _ = ticker.tick() => {
                match ctx.engine.refresh_and_reconcile(&ctx.session, &previous, None).await {
                    Ok((next, diff)) => {
                        print_transitions(global, &diff.transitions)?;
                        health.record_success(next.taken_at);
                        previous = next;
                    }
                    // Keep the last good snapshot and try again next tick.
                    Err(e) => {
                        tracing::warn!(target: "cli", code = e.code(), error = %e, "refresh failed");
                        health.record_failure(&e);
                    }
                }
            }
        }
    }
}
