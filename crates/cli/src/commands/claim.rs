// Path: crates/cli/src/commands/claim.rs

use crate::util::{self, SelectionArgs};
use crate::GlobalArgs;
use anyhow::{anyhow, bail, Result};
use clap::Parser;
use claimkit_types::prelude::*;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
pub struct ClaimArgs {
    #[clap(flatten)]
    pub selection: SelectionArgs,

    /// Submit without asking for confirmation.
    #[clap(long, short = 'y')]
    pub yes: bool,

    /// Keep refreshing until every claimed item settles.
    #[clap(long)]
    pub watch: bool,
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// Errors before submission never reach the authority.
fn not_sent(e: ClaimError) -> anyhow::Error {
    if e.is_precondition() {
        anyhow!("claim refused [{}]: {e}; nothing was sent", e.code())
    } else {
        anyhow!("claim not submitted [{}]: {e}", e.code())
    }
}

pub async fn run(global: &GlobalArgs, args: ClaimArgs) -> Result<()> {
    let ctx = util::connect(global)?;
    let snapshot = ctx.engine.fetch_claimable_rewards(&ctx.session).await?;
    let items = util::select(&snapshot, &args.selection)?;
    let batch = ClaimBatch::new(items)?;

    let prepared = ctx
        .engine
        .prepare_claim(&ctx.session, batch)
        .await
        .map_err(not_sent)?;
    let decimals = util::native_decimals(&ctx.config, prepared.batch().chain_id());
    if !global.json {
        println!(
            "claiming {} reward(s) via {}: {}",
            prepared.batch().len(),
            prepared.batch().source(),
            prepared.batch().key()
        );
        if let Some(estimate) = prepared.estimate() {
            println!("estimated {}", util::describe_estimate(estimate, decimals));
        }
    }
    if !args.yes && !confirm("submit?").await? {
        // Dropping the prepared claim sends nothing.
        println!("aborted");
        return Ok(());
    }

    let outcome = ctx
        .engine
        .submit_claim_batch(&ctx.session, prepared)
        .await
        .map_err(not_sent)?;
    tracing::info!(
        target: "cli",
        batch = %outcome.batch_key,
        status = ?outcome.status(),
        tx = ?outcome.tx_hash,
        "batch submitted"
    );

    let (next, diff) = if args.watch {
        ctx.engine
            .watch_until_settled(&ctx.session, &snapshot, &outcome)
            .await?
    } else {
        ctx.engine
            .refresh_and_reconcile(&ctx.session, &snapshot, Some(&outcome))
            .await?
    };

    if global.json {
        util::print_json(&json!({
            "outcome": outcome,
            "status": outcome.status(),
            "reconciled": diff,
            "snapshot": next,
        }))?;
    } else {
        println!("status: {:?}", outcome.status());
        if let Some(tx) = outcome.tx_hash {
            println!("tx: {tx}");
        }
        if let Some(error) = &outcome.error {
            println!("error: [{}] {error}", error.code());
        }
        for (id, state) in &diff.outcomes {
            match state {
                ReconciledState::Claimed => println!("  claimed  {id}"),
                ReconciledState::StillPending => println!("  pending  {id}"),
                ReconciledState::Failed(e) => println!("  failed   {id}: {e}"),
            }
        }
    }

    if outcome.status() == BatchStatus::Failure && diff.claimed().is_empty() {
        bail!("no reward was claimed");
    }
    Ok(())
}
