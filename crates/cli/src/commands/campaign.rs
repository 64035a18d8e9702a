// Path: crates/cli/src/commands/campaign.rs

use crate::util;
use crate::GlobalArgs;
use anyhow::{Context as _, Result};
use clap::Parser;
use claimkit_types::estimate::format_units;
use claimkit_types::prelude::*;
use serde_json::json;

#[derive(Parser, Debug)]
pub struct CampaignArgs {
    /// Chain the distributor lives on.
    #[clap(long)]
    pub chain: u64,

    /// Campaign id.
    #[clap(long)]
    pub id: u64,

    /// Also report whether this account is a quest manager.
    #[clap(long)]
    pub manager: Option<String>,
}

pub async fn run(global: &GlobalArgs, args: CampaignArgs) -> Result<()> {
    let ctx = util::connect(global)?;
    let source = ctx.engine.chains().resolve(args.chain)?;

    let campaign = source.get_campaign(U256::from(args.id)).await?;
    let paused = source.is_paused().await?;
    let claimed = match ctx.session.account() {
        Some(account) => Some(source.has_claimed(U256::from(args.id), account).await?),
        None => None,
    };
    let manager = match args.manager.as_deref() {
        Some(raw) => {
            let account: Address = raw.parse().context("--manager")?;
            Some((account, source.is_quest_manager(account).await?))
        }
        None => None,
    };

    if global.json {
        return util::print_json(&json!({
            "chainId": args.chain,
            "campaignId": args.id,
            "campaign": campaign,
            "paused": paused,
            "claimed": claimed,
            "questManager": manager.map(|(a, m)| json!({"account": a, "isManager": m})),
        }));
    }

    println!("campaign {} on chain {}", args.id, args.chain);
    println!("  quest:     {}", campaign.quest_id);
    println!("  token:     {}", campaign.reward_token);
    println!(
        "  rewards:   {} claimed of {} ({} remaining)",
        format_units(campaign.claimed_rewards, 0),
        format_units(campaign.total_rewards, 0),
        format_units(campaign.remaining(), 0)
    );
    println!("  deadline:  {}", campaign.deadline);
    println!("  active:    {}", campaign.is_active);
    println!("  paused:    {paused}");
    if let Some(claimed) = claimed {
        println!("  claimed:   {claimed}");
    }
    if let Some((account, is_manager)) = manager {
        println!("  manager {account}: {is_manager}");
    }
    Ok(())
}
