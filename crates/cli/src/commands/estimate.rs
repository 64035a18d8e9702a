// Path: crates/cli/src/commands/estimate.rs

use crate::util::{self, SelectionArgs};
use crate::GlobalArgs;
use anyhow::{bail, Result};
use clap::Parser;
use claimkit_types::prelude::*;
use serde_json::json;

#[derive(Parser, Debug)]
pub struct EstimateArgs {
    #[clap(flatten)]
    pub selection: SelectionArgs,
}

pub async fn run(global: &GlobalArgs, args: EstimateArgs) -> Result<()> {
    if !args.selection.ledger_ids.is_empty() {
        bail!("ledger claims cost no gas; select on-chain campaigns with --campaign");
    }
    let ctx = util::connect(global)?;
    let snapshot = ctx.engine.fetch_claimable_rewards(&ctx.session).await?;
    let items = util::select(&snapshot, &args.selection)?;

    let estimate = match ctx.engine.estimate_batch_cost(&ctx.session, items).await? {
        EstimateOutcome::Current(estimate) => estimate,
        EstimateOutcome::Superseded => bail!("selection changed while estimating"),
    };
    let decimals = util::native_decimals(&ctx.config, args.selection.chain);

    if global.json {
        return util::print_json(&json!({
            "chainId": args.selection.chain,
            "estimate": estimate,
            "approximate": estimate.is_approximate(),
        }));
    }
    println!("{}", util::describe_estimate(&estimate, decimals));
    Ok(())
}
