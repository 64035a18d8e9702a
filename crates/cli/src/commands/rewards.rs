// Path: crates/cli/src/commands/rewards.rs

use crate::util::{self, describe};
use crate::GlobalArgs;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct RewardsArgs {
    /// Only list rewards that can be claimed now.
    #[clap(long)]
    pub claimable: bool,
}

pub async fn run(global: &GlobalArgs, args: RewardsArgs) -> Result<()> {
    let ctx = util::connect(global)?;
    let snapshot = ctx.engine.fetch_claimable_rewards(&ctx.session).await?;

    if global.json {
        return util::print_json(&snapshot);
    }

    let show = |title: &str, rewards: &[claimkit_types::prelude::ClaimableReward]| {
        let rows: Vec<_> = rewards
            .iter()
            .filter(|r| !args.claimable || r.is_claimable())
            .collect();
        println!("{title} ({})", rows.len());
        for reward in rows {
            println!("  {}", describe(reward));
        }
    };
    show("On-chain", &snapshot.blockchain);
    show("Ledger", &snapshot.database);

    if !snapshot.unavailable.is_empty() {
        println!("Unavailable ({})", snapshot.unavailable.len());
        for item in &snapshot.unavailable {
            println!("  {}: {}", item.id, item.reason);
        }
    }
    println!("{} rewards as of {}", snapshot.total, snapshot.taken_at);
    Ok(())
}
